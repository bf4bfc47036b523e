#[derive(Default)]
pub struct ReplHinter;

impl ReplHinter {
    pub fn new() -> Self {
        Self::default()
    }
}
