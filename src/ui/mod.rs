pub mod icons;
pub mod renderer;

pub use renderer::StageRenderer;
