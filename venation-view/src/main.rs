//! Application entry point for the venation viewer.
//!
//! This binary installs the tracing subscriber, sets up eframe/egui and
//! delegates all interactive logic and rendering to [`Viewer`].

mod viewer;

use viewer::Viewer;

/// Starts the native eframe application.
///
/// Log output is controlled through `RUST_LOG`.
///
/// ### Returns
/// - `Ok(())` if the application runs to completion without errors.
/// - `Err` if eframe fails to create the native window, or the viewer
///   cannot be initialized.
fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt::init();

    let options = eframe::NativeOptions::default();

    eframe::run_native(
        "2D Venation",
        options,
        Box::new(|_cc| Ok(Box::new(Viewer::new()?))),
    )
}
