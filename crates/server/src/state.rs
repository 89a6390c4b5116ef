use qbr_pptx::TemplateMerger;

/// Shared by every request handler.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub merger: TemplateMerger,
}

impl AppState {
    pub fn new(merger: TemplateMerger) -> Self {
        Self { merger }
    }
}
