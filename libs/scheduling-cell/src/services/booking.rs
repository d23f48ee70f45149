use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::external::{AppointmentLedger, AuditLog, DoctorDirectory};
use crate::models::{
    AuditAction, AuditEvent, BookSlotRequest, BookingConfirmation, NewAppointment, SchedulingError,
};
use crate::store::AvailabilityStore;

/// Converts a resolved free slot into a booked one without ever mutating the
/// weekly template, then signals the appointment ledger. The reservation is
/// compensated when the ledger refuses, so a booked slot always has an
/// appointment behind it.
pub struct BookingService {
    store: Arc<AvailabilityStore>,
    directory: Arc<dyn DoctorDirectory>,
    ledger: Arc<dyn AppointmentLedger>,
    audit: Arc<dyn AuditLog>,
}

impl BookingService {
    pub fn new(
        store: Arc<AvailabilityStore>,
        directory: Arc<dyn DoctorDirectory>,
        ledger: Arc<dyn AppointmentLedger>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            store,
            directory,
            ledger,
            audit,
        }
    }

    pub async fn book(
        &self,
        doctor_id: Uuid,
        request: BookSlotRequest,
        actor: Uuid,
    ) -> Result<BookingConfirmation, SchedulingError> {
        info!(
            "Booking request for doctor {} on {} at {}-{}",
            doctor_id, request.date, request.start_time, request.end_time
        );

        if request.start_time >= request.end_time {
            return Err(SchedulingError::invalid(
                "start_time",
                "must be before end time",
            ));
        }

        self.directory
            .find(doctor_id)
            .await?
            .ok_or_else(|| SchedulingError::NotFound(format!("doctor {}", doctor_id)))?;

        let booked = match self
            .store
            .book_slot(
                doctor_id,
                request.date,
                request.start_time,
                request.end_time,
                actor,
            )
            .await
        {
            Ok(booked) => booked,
            Err(err) => {
                self.audit.record(AuditEvent::failure(
                    actor,
                    AuditAction::BookSlot,
                    doctor_id,
                    err.to_string(),
                ));
                return Err(err);
            }
        };

        let appointment = NewAppointment {
            doctor_id,
            patient_id: request.patient_id,
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
            booked_by: actor,
        };

        match self.ledger.create_appointment(&appointment).await {
            Ok(appointment_id) => {
                info!(
                    "Appointment {} created for doctor {} on {} ({}-{})",
                    appointment_id, doctor_id, request.date, request.start_time, request.end_time
                );
                self.audit.record(AuditEvent::success(
                    actor,
                    AuditAction::BookSlot,
                    doctor_id,
                    Some(booked.record_id),
                ));
                Ok(BookingConfirmation {
                    appointment_id,
                    record_id: booked.record_id,
                    doctor_id,
                    date: request.date,
                    slot: booked.slot,
                    materialized: booked.materialized,
                })
            }
            Err(err) => {
                warn!(
                    "Appointment ledger rejected booking for doctor {} on {}: {}; releasing slot",
                    doctor_id, request.date, err
                );
                if let Err(release_err) = self
                    .store
                    .release_slot(
                        booked.record_id,
                        request.start_time,
                        request.end_time,
                        actor,
                    )
                    .await
                {
                    // A booked slot with no appointment behind it; surfaced
                    // loudly rather than papered over.
                    error!(
                        "Failed to release slot on record {} after ledger failure: {}",
                        booked.record_id, release_err
                    );
                }
                self.audit.record(AuditEvent::failure(
                    actor,
                    AuditAction::BookSlot,
                    doctor_id,
                    err.to_string(),
                ));
                self.audit.record(AuditEvent::success(
                    actor,
                    AuditAction::ReleaseSlot,
                    doctor_id,
                    Some(booked.record_id),
                ));
                Err(err)
            }
        }
    }
}
