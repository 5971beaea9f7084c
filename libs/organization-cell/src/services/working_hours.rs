use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{QueryBuilder, SupabaseClient};

use crate::models::{
    check_within_parent, Clinic, DaySchedule, OrganizationError, OwnerType, SetWorkingHoursRequest,
    WorkingHours,
};

const TABLE: &str = "working_hours";

pub struct WorkingHoursService {
    supabase: SupabaseClient,
}

impl WorkingHoursService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_week(
        &self,
        organization_id: Uuid,
        owner_type: OwnerType,
        owner_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<WorkingHours>, OrganizationError> {
        let query = QueryBuilder::new()
            .eq("organization_id", organization_id)
            .eq("owner_type", owner_type)
            .eq("owner_id", owner_id)
            .order("day_of_week", true);

        Ok(self.supabase.select(TABLE, &query, auth_token).await?)
    }

    /// Replace the owner's weekly schedule.
    pub async fn set_week(
        &self,
        organization_id: Uuid,
        owner_type: OwnerType,
        owner_id: Uuid,
        request: SetWorkingHoursRequest,
        auth_token: &str,
    ) -> Result<Vec<WorkingHours>, OrganizationError> {
        debug!("Replacing {} working hours for {} {}", request.days.len(), owner_type, owner_id);

        self.ensure_owner_exists(organization_id, owner_type, owner_id, auth_token).await?;

        if owner_type == OwnerType::Clinic {
            let clinic: Option<Clinic> = self.supabase.select_one(
                "clinics",
                QueryBuilder::new().eq("id", owner_id),
                auth_token,
            ).await?;

            if let Some(complex_id) = clinic.and_then(|c| c.complex_id) {
                let parent: Vec<DaySchedule> = self
                    .get_week(organization_id, OwnerType::Complex, complex_id, auth_token)
                    .await?
                    .into_iter()
                    .map(|wh| wh.schedule)
                    .collect();
                check_within_parent(&request.days, &parent)?;
            }
        }

        let owner_filter = QueryBuilder::new()
            .eq("organization_id", organization_id)
            .eq("owner_type", owner_type)
            .eq("owner_id", owner_id);
        self.supabase.delete(TABLE, &owner_filter, auth_token).await?;

        let now = Utc::now().to_rfc3339();
        let rows: Vec<Value> = request
            .days
            .iter()
            .map(|day| working_hours_row(organization_id, owner_type, owner_id, day, &now))
            .collect();

        let inserted = self.supabase.insert_many(TABLE, rows, auth_token).await?;
        let mut week = inserted
            .into_iter()
            .map(serde_json::from_value::<WorkingHours>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(shared_database::DatabaseError::from)?;
        week.sort_by_key(|wh| wh.schedule.day_of_week);

        Ok(week)
    }

    async fn ensure_owner_exists(
        &self,
        organization_id: Uuid,
        owner_type: OwnerType,
        owner_id: Uuid,
        auth_token: &str,
    ) -> Result<(), OrganizationError> {
        let (table, entity) = match owner_type {
            OwnerType::Complex => ("complexes", "Complex"),
            OwnerType::Clinic => ("clinics", "Clinic"),
            OwnerType::Doctor => ("doctors", "Doctor"),
        };

        let query = QueryBuilder::new()
            .eq("id", owner_id)
            .eq("organization_id", organization_id);
        if self.supabase.exists(table, query, auth_token).await? {
            Ok(())
        } else {
            Err(OrganizationError::NotFound(entity))
        }
    }
}

/// Row for the `working_hours` table; shared with onboarding.
pub fn working_hours_row(
    organization_id: Uuid,
    owner_type: OwnerType,
    owner_id: Uuid,
    day: &DaySchedule,
    timestamp: &str,
) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "organization_id": organization_id,
        "owner_type": owner_type,
        "owner_id": owner_id,
        "day_of_week": day.day_of_week,
        "is_working": day.is_working,
        "open_time": day.open_time,
        "close_time": day.close_time,
        "break_start": day.break_start,
        "break_end": day.break_end,
        "created_at": timestamp,
        "updated_at": timestamp
    })
}
