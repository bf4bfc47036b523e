#[derive(Default)]
pub struct ReplValidator;

impl ReplValidator {
    pub fn new() -> Self {
        Self::default()
    }
}
