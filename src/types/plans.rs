use serde::Serialize;

/// A billing plan offered when completing an appointment.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlanOption {
    pub value: &'static str,
    pub label: &'static str,
    pub suggested_price: f64,
}

/// Plans offered by default. Effectuation accepts any non-empty plan name;
/// this list only seeds the client's picker.
pub const PLAN_CATALOG: [PlanOption; 4] = [
    PlanOption {
        value: "consulta_avulsa",
        label: "Single session",
        suggested_price: 150.0,
    },
    PlanOption {
        value: "plano_trimestral",
        label: "Quarterly plan",
        suggested_price: 120.0,
    },
    PlanOption {
        value: "plano_semestral",
        label: "Semiannual plan",
        suggested_price: 100.0,
    },
    PlanOption {
        value: "plano_anual",
        label: "Annual plan",
        suggested_price: 80.0,
    },
];
