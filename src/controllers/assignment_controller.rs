//! Controller de las acciones del conductor sobre su assignment

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::models::assignment::{Assignment, AssignmentResponse};
use crate::models::shift::{
    CompleteShiftRequest, EditShiftRequest, ShiftResponse, StartShiftRequest,
};
use crate::services::lifecycle_service::LifecycleService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct AssignmentController {
    lifecycle: LifecycleService,
}

impl AssignmentController {
    pub fn new(state: &AppState) -> Self {
        Self {
            lifecycle: LifecycleService::new(
                state.pool.clone(),
                state.config.dispatch.clone(),
                state.notifier.clone(),
            ),
        }
    }

    pub async fn confirm(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<AssignmentResponse, AppError> {
        let assignment = self
            .lifecycle
            .confirm(organization_id, assignment_id, Utc::now())
            .await?;
        Ok(assignment.into())
    }

    pub async fn arrive(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<ShiftResponse, AppError> {
        let shift = self
            .lifecycle
            .arrive(organization_id, assignment_id, Utc::now())
            .await?;
        Ok(shift.into())
    }

    pub async fn start(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        request: StartShiftRequest,
    ) -> Result<ShiftResponse, AppError> {
        request.validate()?;
        let shift = self
            .lifecycle
            .start_shift(organization_id, assignment_id, request.parcels_start)
            .await?;
        Ok(shift.into())
    }

    pub async fn complete(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        request: CompleteShiftRequest,
    ) -> Result<ShiftResponse, AppError> {
        request.validate()?;
        let shift = self
            .lifecycle
            .complete(organization_id, assignment_id, request, Utc::now())
            .await?;
        Ok(shift.into())
    }

    pub async fn cancel(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<AssignmentResponse, AppError> {
        let assignment: Assignment = self
            .lifecycle
            .cancel(organization_id, assignment_id, Utc::now())
            .await?;
        Ok(assignment.into())
    }

    pub async fn edit_shift(
        &self,
        organization_id: Uuid,
        shift_id: Uuid,
        request: EditShiftRequest,
    ) -> Result<ShiftResponse, AppError> {
        request.validate()?;
        let shift = self
            .lifecycle
            .edit_shift(organization_id, shift_id, request, Utc::now())
            .await?;
        Ok(shift.into())
    }
}
