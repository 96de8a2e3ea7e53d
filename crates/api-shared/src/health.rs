use crate::wire::HealthRes;

/// Simple health service shared by every API surface.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static health check; no instance needed.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Ward & Lab API is alive".into(),
        }
    }
}
