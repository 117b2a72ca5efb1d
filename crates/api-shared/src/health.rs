use crate::dto::HealthRes;

/// Health check shared by every HIS server binary.
#[derive(Clone, Debug, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// A `HealthRes` indicating the service is up.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "HIS is alive".into(),
        }
    }
}
