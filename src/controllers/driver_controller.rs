//! Controller de conductores y sus preferencias

use uuid::Uuid;
use validator::Validate;

use crate::models::driver::{
    CreateDriverRequest, DriverPreference, DriverResponse, UpdatePreferencesRequest,
};
use crate::models::health::HealthStateResponse;
use crate::models::metrics::DriverMetricsResponse;
use crate::repositories::driver_repository::DriverRepository;
use crate::services::health_service::HealthService;
use crate::services::metrics_service::MetricsService;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError};

pub struct DriverController {
    drivers: DriverRepository,
    health: HealthService,
    metrics: MetricsService,
}

impl DriverController {
    pub fn new(state: &AppState) -> Self {
        Self {
            drivers: DriverRepository::new(state.pool.clone()),
            health: HealthService::new(
                state.pool.clone(),
                state.config.dispatch.clone(),
                state.notifier.clone(),
            ),
            metrics: MetricsService::new(
                state.pool.clone(),
                state.config.dispatch.clone(),
                state.notifier.clone(),
            ),
        }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        request: CreateDriverRequest,
    ) -> Result<DriverResponse, AppError> {
        request.validate()?;
        let driver = self
            .drivers
            .create(organization_id, request.full_name, request.phone)
            .await?;
        Ok(driver.into())
    }

    pub async fn get(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<DriverResponse, AppError> {
        let driver = self
            .drivers
            .find_by_id(organization_id, driver_id)
            .await?
            .ok_or_else(|| not_found_error("Driver", &driver_id.to_string()))?;
        Ok(driver.into())
    }

    pub async fn deactivate(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<(), AppError> {
        let deactivated = self.drivers.deactivate(organization_id, driver_id).await?;
        if !deactivated {
            return Err(not_found_error("Driver", &driver_id.to_string()));
        }
        Ok(())
    }

    /// Preferencias: días 0-6 (0 = lunes) y hasta 3 rutas. Mutables en
    /// cualquier momento; el scheduler las congela al generar la semana.
    pub async fn update_preferences(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        request: UpdatePreferencesRequest,
    ) -> Result<DriverPreference, AppError> {
        request.validate()?;
        if request.weekdays.iter().any(|d| !(0..=6).contains(d)) {
            return Err(AppError::BadRequest(
                "weekdays must be between 0 (Monday) and 6 (Sunday)".to_string(),
            ));
        }

        self.drivers
            .find_by_id(organization_id, driver_id)
            .await?
            .ok_or_else(|| not_found_error("Driver", &driver_id.to_string()))?;

        self.drivers
            .upsert_preferences(
                organization_id,
                driver_id,
                request.weekdays,
                request.preferred_route_ids,
            )
            .await
    }

    pub async fn get_health(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<HealthStateResponse, AppError> {
        let state = self
            .health
            .state_for(organization_id, driver_id)
            .await?
            .ok_or_else(|| not_found_error("DriverHealthState", &driver_id.to_string()))?;
        Ok(state.into())
    }

    pub async fn get_metrics(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<DriverMetricsResponse, AppError> {
        let metrics = self
            .metrics
            .find(organization_id, driver_id)
            .await?
            .ok_or_else(|| not_found_error("DriverMetrics", &driver_id.to_string()))?;
        Ok(metrics.into())
    }
}
