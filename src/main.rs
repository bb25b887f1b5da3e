//! Shader Stack - fragment effect chain previewer

use shader_stack::settings::PreviewSettings;
use shader_stack::telemetry::init_logging;
use shader_stack::{AppError, ShaderStackApp};
use winit::event_loop::{ControlFlow, EventLoop};

fn main() -> Result<(), AppError> {
    let settings = PreviewSettings::load();

    // Keep the guard alive for the program duration
    let _log_guard = match init_logging(&settings.log_config()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("Shader Stack v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Render size: {}x{}", settings.render_width, settings.render_height);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ShaderStackApp::new(settings);
    event_loop.run_app(&mut app)?;
    app.finish()
}
