use tabled::Tabled;

#[derive(Tabled)]
pub struct OutcomeRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Scenario")]
    pub scenario: String,
    #[tabled(rename = "Outcome")]
    pub outcome: &'static str,
    #[tabled(rename = "Duration (ms)", display = "duration_ms")]
    pub duration_ms: Option<f64>,
    #[tabled(rename = "Session")]
    pub session_id: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

fn duration_ms(n: &Option<f64>) -> String {
    n.map(|n| format!("{:.2}", n)).unwrap_or_else(|| "-".to_string())
}
