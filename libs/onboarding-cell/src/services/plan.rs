use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use organization_cell::models::{check_within_parent, EntityStatus, OrganizationStatus, OwnerType};
use organization_cell::services::clinic::round_money;
use organization_cell::services::working_hours::working_hours_row;
use shared_utils::validation::{normalize_name, ValidationErrors};

use crate::models::{
    CreatedIds, EntityKind, OnboardingError, OnboardingPlan, OnboardingRequest, PlannedOperation,
};

/// A vertex of the creation graph. `depends_on` lists the indexes of nodes
/// that must be inserted first.
#[derive(Debug, Clone)]
pub struct PlanNode {
    pub kind: EntityKind,
    pub key: String,
    pub depends_on: Vec<usize>,
}

/// Kahn's algorithm. Among ready nodes the lowest kind rank goes first,
/// then the earliest node.
pub fn topological_order(nodes: &[PlanNode]) -> Result<Vec<usize>, OnboardingError> {
    let mut in_degree: Vec<usize> = nodes.iter().map(|n| n.depends_on.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        for &dependency in &node.depends_on {
            if let Some(list) = dependents.get_mut(dependency) {
                list.push(index);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<(u8, usize)>> = nodes
        .iter()
        .enumerate()
        .filter(|(index, _)| in_degree[*index] == 0)
        .map(|(index, node)| Reverse((node.kind.rank(), index)))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse((_, index))) = ready.pop() {
        order.push(index);
        for &next in &dependents[index] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse((nodes[next].kind.rank(), next)));
            }
        }
    }

    if order.len() < nodes.len() {
        let stuck = nodes
            .iter()
            .enumerate()
            .filter(|(index, _)| in_degree[*index] > 0)
            .map(|(_, node)| format!("{}:{}", node.kind, node.key))
            .collect();
        return Err(OnboardingError::DependencyCycle(stuck));
    }

    Ok(order)
}

/// Trimmed, non-empty clinic license numbers of the payload.
pub fn payload_licenses(request: &OnboardingRequest) -> Vec<String> {
    request
        .clinics
        .iter()
        .filter_map(|c| c.license_number.as_deref())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Graph under construction: nodes, their ids and the rows each one emits.
#[derive(Default)]
struct Graph {
    nodes: Vec<PlanNode>,
    ids: Vec<Uuid>,
    rows: Vec<Vec<(String, Value)>>,
}

impl Graph {
    fn push(&mut self, kind: EntityKind, key: &str, depends_on: Vec<usize>, id: Uuid) -> usize {
        self.nodes.push(PlanNode {
            kind,
            key: key.to_string(),
            depends_on,
        });
        self.ids.push(id);
        self.rows.push(Vec::new());
        self.nodes.len() - 1
    }
}

fn resolve(
    index: &HashMap<&str, usize>,
    entity: EntityKind,
    key: &str,
    target: EntityKind,
    reference: &str,
) -> Result<usize, OnboardingError> {
    index
        .get(reference)
        .copied()
        .ok_or_else(|| OnboardingError::UnknownReference {
            entity,
            key: key.to_string(),
            target,
            reference: reference.to_string(),
        })
}

fn check_unique_keys(request: &OnboardingRequest) -> Result<(), OnboardingError> {
    let mut seen = HashSet::new();
    let keys = request
        .complexes
        .iter()
        .map(|c| c.key.as_str())
        .chain(request.departments.iter().map(|d| d.key.as_str()))
        .chain(request.clinics.iter().map(|c| c.key.as_str()))
        .chain(request.services.iter().map(|s| s.key.as_str()));

    for key in keys {
        if !seen.insert(key) {
            return Err(OnboardingError::DuplicateKey(key.to_string()));
        }
    }
    Ok(())
}

fn check_payload_licenses(request: &OnboardingRequest) -> Result<(), OnboardingError> {
    let mut seen = HashSet::new();
    for license in payload_licenses(request) {
        if !seen.insert(license.clone()) {
            return Err(OnboardingError::DuplicateLicense(license));
        }
    }
    Ok(())
}

/// The uniqueness rules the directory enforces on direct creation, applied
/// among the payload's own entities: complex `name_en` per organization,
/// department code per complex and service `name_en` per clinic.
fn check_payload_names(request: &OnboardingRequest) -> Result<(), OnboardingError> {
    fn claim<'a>(
        errors: &mut ValidationErrors,
        seen: &mut HashMap<(&'a str, String), &'a str>,
        scope: &'a str,
        value: String,
        key: &'a str,
        field: String,
    ) {
        if value.is_empty() {
            return;
        }
        if let Some(first) = seen.get(&(scope, value.clone())) {
            errors.add(field, format!("'{}' repeats the value already used by '{}'", key, first));
        } else {
            seen.insert((scope, value), key);
        }
    }

    let mut errors = ValidationErrors::new();

    let mut complexes = HashMap::new();
    for (i, complex) in request.complexes.iter().enumerate() {
        let name = normalize_name(&complex.details.name_en).to_lowercase();
        claim(&mut errors, &mut complexes, "", name, &complex.key, format!("complexes[{}].name_en", i));
    }

    let mut codes = HashMap::new();
    for (i, department) in request.departments.iter().enumerate() {
        let code = department.code.trim().to_uppercase();
        let scope = department.complex_key.as_str();
        claim(&mut errors, &mut codes, scope, code, &department.key, format!("departments[{}].code", i));
    }

    let mut services = HashMap::new();
    for (i, service) in request.services.iter().enumerate() {
        let name = normalize_name(&service.details.name_en).to_lowercase();
        let scope = service.clinic_key.as_str();
        claim(&mut errors, &mut services, scope, name, &service.key, format!("services[{}].name_en", i));
    }

    errors.into_result().map_err(OnboardingError::from)
}

/// Assign ids, resolve every key reference into a foreign key and order the
/// inserts so each row follows the rows it points at. Nothing is written.
pub fn build_plan(
    request: &OnboardingRequest,
    owner_id: Uuid,
    default_session_minutes: i32,
    timestamp: &str,
) -> Result<OnboardingPlan, OnboardingError> {
    check_unique_keys(request)?;
    check_payload_licenses(request)?;
    check_payload_names(request)?;

    let mut graph = Graph::default();
    let mut ids = CreatedIds::default();

    let organization = &request.organization;
    let organization_id = Uuid::new_v4();
    let root = graph.push(EntityKind::Organization, &organization.slug, vec![], organization_id);
    graph.rows[root].push((
        organization.slug.clone(),
        json!({
            "id": organization_id,
            "name_ar": normalize_name(&organization.name_ar),
            "name_en": normalize_name(&organization.name_en),
            "slug": organization.slug,
            "email": organization.email,
            "phone": organization.phone,
            "owner_id": owner_id,
            "status": OrganizationStatus::Active,
            "created_at": timestamp,
            "updated_at": timestamp
        }),
    ));
    ids.organization = organization_id;

    let mut complex_nodes: HashMap<&str, usize> = HashMap::new();
    for complex in &request.complexes {
        let id = Uuid::new_v4();
        let node = graph.push(EntityKind::Complex, &complex.key, vec![root], id);
        let details = &complex.details;
        graph.rows[node].push((
            complex.key.clone(),
            json!({
                "id": id,
                "organization_id": organization_id,
                "name_ar": normalize_name(&details.name_ar),
                "name_en": normalize_name(&details.name_en),
                "address": details.address,
                "city": details.city,
                "phone": details.phone,
                "status": EntityStatus::Active,
                "created_at": timestamp,
                "updated_at": timestamp
            }),
        ));
        complex_nodes.insert(complex.key.as_str(), node);
        ids.complexes.insert(complex.key.clone(), id);
    }

    let mut department_nodes: HashMap<&str, usize> = HashMap::new();
    let mut department_complex: HashMap<&str, &str> = HashMap::new();
    for department in &request.departments {
        let complex = resolve(
            &complex_nodes,
            EntityKind::Department,
            &department.key,
            EntityKind::Complex,
            &department.complex_key,
        )?;
        let id = Uuid::new_v4();
        let node = graph.push(EntityKind::Department, &department.key, vec![complex], id);
        graph.rows[node].push((
            department.key.clone(),
            json!({
                "id": id,
                "organization_id": organization_id,
                "complex_id": graph.ids[complex],
                "name_ar": normalize_name(&department.name_ar),
                "name_en": normalize_name(&department.name_en),
                "code": department.code.trim().to_uppercase(),
                "description": department.description,
                "created_at": timestamp,
                "updated_at": timestamp
            }),
        ));
        department_nodes.insert(department.key.as_str(), node);
        department_complex.insert(department.key.as_str(), department.complex_key.as_str());
        ids.departments.insert(department.key.clone(), id);
    }

    let mut clinic_nodes: HashMap<&str, usize> = HashMap::new();
    let mut clinic_complex: HashMap<&str, &str> = HashMap::new();
    for clinic in &request.clinics {
        let mut depends_on = Vec::new();
        let complex = match clinic.complex_key.as_deref() {
            Some(reference) => {
                let node = resolve(&complex_nodes, EntityKind::Clinic, &clinic.key, EntityKind::Complex, reference)?;
                depends_on.push(node);
                clinic_complex.insert(clinic.key.as_str(), reference);
                Some(graph.ids[node])
            }
            None => {
                depends_on.push(root);
                None
            }
        };
        let department = match clinic.department_key.as_deref() {
            Some(reference) => {
                let node = resolve(&department_nodes, EntityKind::Clinic, &clinic.key, EntityKind::Department, reference)?;
                if department_complex.get(reference).copied() != clinic.complex_key.as_deref() {
                    return Err(OnboardingError::DepartmentComplexMismatch {
                        clinic: clinic.key.clone(),
                        department: reference.to_string(),
                    });
                }
                depends_on.push(node);
                Some(graph.ids[node])
            }
            None => None,
        };

        let id = Uuid::new_v4();
        let node = graph.push(EntityKind::Clinic, &clinic.key, depends_on, id);
        graph.rows[node].push((
            clinic.key.clone(),
            json!({
                "id": id,
                "organization_id": organization_id,
                "complex_id": complex,
                "department_id": department,
                "name_ar": normalize_name(&clinic.name_ar),
                "name_en": normalize_name(&clinic.name_en),
                "license_number": clinic.license_number.as_deref().map(str::trim),
                "phone": clinic.phone,
                "email": clinic.email,
                "session_duration_minutes": clinic.session_duration_minutes.unwrap_or(default_session_minutes),
                "status": EntityStatus::Active,
                "created_at": timestamp,
                "updated_at": timestamp
            }),
        ));
        clinic_nodes.insert(clinic.key.as_str(), node);
        ids.clinics.insert(clinic.key.clone(), id);
    }

    for service in &request.services {
        let clinic = resolve(&clinic_nodes, EntityKind::Service, &service.key, EntityKind::Clinic, &service.clinic_key)?;
        let id = Uuid::new_v4();
        let node = graph.push(EntityKind::Service, &service.key, vec![clinic], id);
        let details = &service.details;
        graph.rows[node].push((
            service.key.clone(),
            json!({
                "id": id,
                "organization_id": organization_id,
                "clinic_id": graph.ids[clinic],
                "name_ar": normalize_name(&details.name_ar),
                "name_en": normalize_name(&details.name_en),
                "price": round_money(details.price),
                "duration_minutes": details.duration_minutes,
                "is_active": true,
                "created_at": timestamp,
                "updated_at": timestamp
            }),
        ));
        ids.services.insert(service.key.clone(), id);
    }

    check_working_hours(request, &clinic_complex)?;
    for hours in &request.working_hours {
        let owner = match hours.owner_type {
            OwnerType::Complex => &complex_nodes,
            OwnerType::Clinic => &clinic_nodes,
            OwnerType::Doctor => {
                let mut errors = ValidationErrors::new();
                errors.add("working_hours.owner_type", "must be complex or clinic");
                return Err(errors.into());
            }
        };
        let target = match hours.owner_type {
            OwnerType::Complex => EntityKind::Complex,
            _ => EntityKind::Clinic,
        };
        let owner_node = resolve(owner, EntityKind::WorkingHours, &hours.owner_key, target, &hours.owner_key)?;
        let owner_id = graph.ids[owner_node];

        let key = format!("{}:{}", hours.owner_type, hours.owner_key);
        let node = graph.push(EntityKind::WorkingHours, &key, vec![owner_node], Uuid::nil());
        for day in &hours.days {
            graph.rows[node].push((
                format!("{}:{}", key, day.day_of_week),
                working_hours_row(organization_id, hours.owner_type, owner_id, day, timestamp),
            ));
        }
    }

    let order = topological_order(&graph.nodes)?;
    let mut operations = Vec::new();
    for index in order {
        let table = graph.nodes[index].kind.table();
        for (key, row) in std::mem::take(&mut graph.rows[index]) {
            operations.push(PlannedOperation {
                table: table.to_string(),
                key,
                row,
            });
        }
    }

    debug!("Onboarding plan for '{}' has {} operations", organization.slug, operations.len());
    Ok(OnboardingPlan { ids, operations })
}

/// One schedule per owner, and clinic hours inside their complex's hours
/// when both are part of the payload.
fn check_working_hours(
    request: &OnboardingRequest,
    clinic_complex: &HashMap<&str, &str>,
) -> Result<(), OnboardingError> {
    let mut errors = ValidationErrors::new();
    let mut owners: HashMap<(OwnerType, &str), usize> = HashMap::new();

    for (index, hours) in request.working_hours.iter().enumerate() {
        if let Some(first) = owners.insert((hours.owner_type, hours.owner_key.as_str()), index) {
            errors.add(
                format!("working_hours[{}].owner_key", index),
                format!("duplicates working_hours[{}]", first),
            );
        }
    }

    for (index, hours) in request.working_hours.iter().enumerate() {
        if hours.owner_type != OwnerType::Clinic {
            continue;
        }
        let parent = clinic_complex
            .get(hours.owner_key.as_str())
            .and_then(|complex_key| owners.get(&(OwnerType::Complex, *complex_key)))
            .and_then(|&i| request.working_hours.get(i));
        if let Some(parent) = parent {
            if let Err(e) = check_within_parent(&hours.days, &parent.days) {
                errors.merge(&format!("working_hours[{}]", index), e);
            }
        }
    }

    errors.into_result().map_err(OnboardingError::from)
}
