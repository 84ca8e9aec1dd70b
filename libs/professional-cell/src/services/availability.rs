use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    parse_grid_time, AvailabilitySlot, DayAvailability, ProfessionalError, SlotStatus, TimeSlot,
    Weekday,
};
use crate::services::ProfessionalService;

/// Slot allocator over the `availability_slots` table.
///
/// Slots are addressed by identity (professional, day, start, end) rather
/// than by row id, so bookings key on the time range the parent actually
/// chose. State changes go through filtered PATCH requests with
/// `return=representation`: an empty result means the predicate did not
/// match, which doubles as the lost-the-race signal for reservations.
pub struct AvailabilityService {
    supabase: SupabaseClient,
    professionals: ProfessionalService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            professionals: ProfessionalService::new(config),
        }
    }

    fn slot_predicate(professional_id: &str, day: Weekday, start: &str, end: &str) -> String {
        format!(
            "professional_id=eq.{}&day=eq.{}&start_time=eq.{}&end_time=eq.{}",
            professional_id,
            day,
            urlencoding::encode(start),
            urlencoding::encode(end),
        )
    }

    /// Weak pre-check used at assignment time: does this professional have
    /// any open slot at all? The hard guarantee comes later, at
    /// confirmation, when the slot is actually reserved.
    pub async fn has_any_open_slot(
        &self,
        professional_id: &str,
        auth_token: &str,
    ) -> Result<bool, ProfessionalError> {
        let path = format!(
            "/rest/v1/availability_slots?professional_id=eq.{}&status=eq.available&limit=1",
            professional_id
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProfessionalError::Database(e.to_string()))?;

        Ok(!rows.is_empty())
    }

    pub async fn find_slot(
        &self,
        professional_id: &str,
        day: Weekday,
        start_time: &str,
        end_time: &str,
        auth_token: &str,
    ) -> Result<Option<AvailabilitySlot>, ProfessionalError> {
        let path = format!(
            "/rest/v1/availability_slots?{}&limit=1",
            Self::slot_predicate(professional_id, day, start_time, end_time)
        );

        let rows: Vec<AvailabilitySlot> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProfessionalError::Database(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    /// Atomically flip a slot from available to booked. The status filter is
    /// part of the PATCH predicate, so two concurrent confirmations for the
    /// same slot cannot both succeed: the loser gets an empty representation
    /// back and surfaces as `SlotNotAvailable`.
    pub async fn reserve_slot(
        &self,
        professional_id: &str,
        day: Weekday,
        start_time: &str,
        end_time: &str,
        auth_token: &str,
    ) -> Result<AvailabilitySlot, ProfessionalError> {
        debug!(
            "Reserving slot for professional {} on {} {}-{}",
            professional_id, day, start_time, end_time
        );

        let path = format!(
            "/rest/v1/availability_slots?{}&status=eq.available",
            Self::slot_predicate(professional_id, day, start_time, end_time)
        );

        let body = json!({
            "status": SlotStatus::Booked,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows = self
            .supabase
            .mutate_returning(Method::PATCH, &path, Some(auth_token), body)
            .await
            .map_err(|e| ProfessionalError::Database(e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or(ProfessionalError::SlotNotAvailable)?;

        serde_json::from_value(row).map_err(|e| ProfessionalError::Database(e.to_string()))
    }

    /// Return a booked slot to the open pool. Keyed on `status=eq.booked`;
    /// a miss is reported as `SlotNotFound` so callers can decide whether
    /// the inconsistency is fatal or just worth a warning.
    pub async fn release_slot(
        &self,
        professional_id: &str,
        day: Weekday,
        start_time: &str,
        end_time: &str,
        auth_token: &str,
    ) -> Result<AvailabilitySlot, ProfessionalError> {
        debug!(
            "Releasing slot for professional {} on {} {}-{}",
            professional_id, day, start_time, end_time
        );

        let path = format!(
            "/rest/v1/availability_slots?{}&status=eq.booked",
            Self::slot_predicate(professional_id, day, start_time, end_time)
        );

        let body = json!({
            "status": SlotStatus::Available,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows = self
            .supabase
            .mutate_returning(Method::PATCH, &path, Some(auth_token), body)
            .await
            .map_err(|e| ProfessionalError::Database(e.to_string()))?;

        let row = rows.into_iter().next().ok_or_else(|| {
            warn!(
                "No booked slot to release for professional {} on {} {}-{}",
                professional_id, day, start_time, end_time
            );
            ProfessionalError::SlotNotFound
        })?;

        serde_json::from_value(row).map_err(|e| ProfessionalError::Database(e.to_string()))
    }

    /// Full weekly grid, grouped by day.
    pub async fn get_weekly_availability(
        &self,
        professional_id: &str,
        auth_token: &str,
    ) -> Result<Vec<DayAvailability>, ProfessionalError> {
        let path = format!(
            "/rest/v1/availability_slots?professional_id=eq.{}&order=day.asc,start_time.asc",
            professional_id
        );

        let rows: Vec<AvailabilitySlot> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProfessionalError::Database(e.to_string()))?;

        let mut grouped: Vec<DayAvailability> = Vec::new();
        for slot in rows {
            match grouped.iter_mut().find(|g| g.day == slot.day) {
                Some(group) => group.time_slots.push(slot),
                None => grouped.push(DayAvailability {
                    day: slot.day,
                    time_slots: vec![slot],
                }),
            }
        }

        Ok(grouped)
    }

    /// Upsert a day's grid. Each submitted range updates the matching row's
    /// status when one exists and inserts a fresh row otherwise, so editing
    /// is idempotent per (day, start, end). Submitted ranges may not overlap
    /// each other or any stored row for the day they do not identity-match.
    /// Booked rows keep their booking: resubmitting a booked range as
    /// "available" does not free it, that only happens through
    /// `release_slot`.
    pub async fn edit_availability(
        &self,
        professional_id: &str,
        request_day: Weekday,
        time_slots: Vec<TimeSlot>,
        auth_token: &str,
    ) -> Result<Vec<AvailabilitySlot>, ProfessionalError> {
        validate_no_overlap(&time_slots)?;

        if !self
            .professionals
            .professional_exists(professional_id, auth_token)
            .await?
        {
            return Err(ProfessionalError::NotFound(format!(
                "Professional {} not found",
                professional_id
            )));
        }

        let stored = self
            .get_day_slots(professional_id, request_day, auth_token)
            .await?;
        validate_no_overlap_with_stored(&time_slots, &stored)?;

        let mut result = Vec::with_capacity(time_slots.len());

        for slot in time_slots {
            let existing = self
                .find_slot(
                    professional_id,
                    request_day,
                    &slot.start_time,
                    &slot.end_time,
                    auth_token,
                )
                .await?;

            let updated = match existing {
                Some(current) if current.status == SlotStatus::Booked => {
                    debug!(
                        "Skipping status change for booked slot {} {}-{}",
                        request_day, slot.start_time, slot.end_time
                    );
                    current
                }
                Some(_) => {
                    self.set_slot_status(
                        professional_id,
                        request_day,
                        &slot.start_time,
                        &slot.end_time,
                        slot.status,
                        auth_token,
                    )
                    .await?
                }
                None => {
                    self.insert_slot(professional_id, request_day, &slot, auth_token)
                        .await?
                }
            };

            result.push(updated);
        }

        Ok(result)
    }

    async fn get_day_slots(
        &self,
        professional_id: &str,
        day: Weekday,
        auth_token: &str,
    ) -> Result<Vec<AvailabilitySlot>, ProfessionalError> {
        let path = format!(
            "/rest/v1/availability_slots?professional_id=eq.{}&day=eq.{}&order=start_time.asc",
            professional_id, day
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProfessionalError::Database(e.to_string()))
    }

    async fn set_slot_status(
        &self,
        professional_id: &str,
        day: Weekday,
        start_time: &str,
        end_time: &str,
        status: SlotStatus,
        auth_token: &str,
    ) -> Result<AvailabilitySlot, ProfessionalError> {
        let path = format!(
            "/rest/v1/availability_slots?{}",
            Self::slot_predicate(professional_id, day, start_time, end_time)
        );

        let body = json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows = self
            .supabase
            .mutate_returning(Method::PATCH, &path, Some(auth_token), body)
            .await
            .map_err(|e| ProfessionalError::Database(e.to_string()))?;

        let row = rows.into_iter().next().ok_or_else(|| {
            ProfessionalError::Database("Slot disappeared during update".to_string())
        })?;

        serde_json::from_value(row).map_err(|e| ProfessionalError::Database(e.to_string()))
    }

    async fn insert_slot(
        &self,
        professional_id: &str,
        day: Weekday,
        slot: &TimeSlot,
        auth_token: &str,
    ) -> Result<AvailabilitySlot, ProfessionalError> {
        let body = json!({
            "professional_id": professional_id,
            "day": day,
            "start_time": slot.start_time,
            "end_time": slot.end_time,
            "status": slot.status,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows = self
            .supabase
            .mutate_returning(
                Method::POST,
                "/rest/v1/availability_slots",
                Some(auth_token),
                body,
            )
            .await
            .map_err(|e| ProfessionalError::Database(e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ProfessionalError::Database("Failed to create slot".to_string()))?;

        serde_json::from_value(row).map_err(|e| ProfessionalError::Database(e.to_string()))
    }
}

/// Reject a grid submission in which any two ranges for the same day
/// overlap. Ranges are half-open, so back-to-back slots (10:00-11:00,
/// 11:00-12:00) are fine.
fn validate_no_overlap(time_slots: &[TimeSlot]) -> Result<(), ProfessionalError> {
    let mut ranges = Vec::with_capacity(time_slots.len());
    for slot in time_slots {
        ranges.push((slot.parse_range()?, slot));
    }

    for (i, ((a_start, a_end), a)) in ranges.iter().enumerate() {
        for ((b_start, b_end), b) in ranges.iter().skip(i + 1) {
            if a_start < b_end && b_start < a_end {
                return Err(ProfessionalError::OverlappingSlots(format!(
                    "{}-{} overlaps {}-{}",
                    a.start_time, a.end_time, b.start_time, b.end_time
                )));
            }
        }
    }

    Ok(())
}

/// Reject submitted ranges that overlap a stored row for the day. Rows the
/// submission identity-matches (same start and end) are excluded: those are
/// updates, not new neighbors.
fn validate_no_overlap_with_stored(
    time_slots: &[TimeSlot],
    stored: &[AvailabilitySlot],
) -> Result<(), ProfessionalError> {
    for slot in time_slots {
        let (start, end) = slot.parse_range()?;

        for row in stored {
            if row.start_time == slot.start_time && row.end_time == slot.end_time {
                continue;
            }

            let row_start = parse_grid_time(&row.start_time)?;
            let row_end = parse_grid_time(&row.end_time)?;

            if start < row_end && row_start < end {
                return Err(ProfessionalError::OverlappingSlots(format!(
                    "{}-{} overlaps existing slot {}-{}",
                    slot.start_time, slot.end_time, row.start_time, row.end_time
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use uuid::Uuid;

    fn slot(start: &str, end: &str) -> TimeSlot {
        TimeSlot {
            start_time: start.to_string(),
            end_time: end.to_string(),
            status: SlotStatus::Available,
        }
    }

    #[test]
    fn back_to_back_slots_do_not_overlap() {
        let slots = vec![slot("10:00", "11:00"), slot("11:00", "12:00")];
        assert!(validate_no_overlap(&slots).is_ok());
    }

    #[test]
    fn nested_range_is_rejected() {
        let slots = vec![slot("09:00", "12:00"), slot("10:00", "11:00")];
        assert_matches!(
            validate_no_overlap(&slots),
            Err(ProfessionalError::OverlappingSlots(_))
        );
    }

    #[test]
    fn partial_overlap_is_rejected() {
        let slots = vec![slot("10:00", "11:30"), slot("11:00", "12:00")];
        assert_matches!(
            validate_no_overlap(&slots),
            Err(ProfessionalError::OverlappingSlots(_))
        );
    }

    #[test]
    fn duplicate_range_is_rejected() {
        let slots = vec![slot("10:00", "11:00"), slot("10:00", "11:00")];
        assert!(validate_no_overlap(&slots).is_err());
    }

    #[test]
    fn malformed_time_is_a_validation_error() {
        let slots = vec![slot("ten o'clock", "11:00")];
        assert_matches!(
            validate_no_overlap(&slots),
            Err(ProfessionalError::Validation(_))
        );
    }

    fn stored_row(start: &str, end: &str, status: SlotStatus) -> AvailabilitySlot {
        AvailabilitySlot {
            id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            day: Weekday::Monday,
            start_time: start.to_string(),
            end_time: end.to_string(),
            status,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn submission_may_not_straddle_a_stored_row() {
        let stored = vec![stored_row("09:00", "10:00", SlotStatus::Available)];
        let slots = vec![slot("09:30", "10:30")];
        assert_matches!(
            validate_no_overlap_with_stored(&slots, &stored),
            Err(ProfessionalError::OverlappingSlots(_))
        );
    }

    #[test]
    fn identity_matched_stored_row_is_an_update_not_a_conflict() {
        let stored = vec![stored_row("09:00", "10:00", SlotStatus::Booked)];
        let slots = vec![slot("09:00", "10:00")];
        assert!(validate_no_overlap_with_stored(&slots, &stored).is_ok());
    }

    #[test]
    fn stored_rows_on_other_ranges_do_not_conflict() {
        let stored = vec![
            stored_row("08:00", "09:00", SlotStatus::Available),
            stored_row("10:00", "11:00", SlotStatus::Booked),
        ];
        let slots = vec![slot("09:00", "10:00")];
        assert!(validate_no_overlap_with_stored(&slots, &stored).is_ok());
    }
}
