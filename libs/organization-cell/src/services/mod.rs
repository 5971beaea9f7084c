pub mod clinic;
pub mod complex;
pub mod department;
pub mod doctor;
pub mod organization;
pub mod working_hours;

pub use clinic::ClinicService;
pub use complex::ComplexService;
pub use department::DepartmentService;
pub use doctor::DoctorService;
pub use organization::OrganizationService;
pub use working_hours::WorkingHoursService;
