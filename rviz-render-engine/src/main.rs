use std::path::PathBuf;

use rviz_render_engine::engine::core::app_setup::create_app;

fn main() {
    // Optional path to a JSON visualisation config.
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    let mut app = match create_app(config_path) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to start visualiser: {e}");
            std::process::exit(1);
        }
    };

    #[cfg(target_arch = "wasm32")]
    {
        wasm_bindgen_futures::spawn_local(async move {
            app.run();
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        app.run();
    }
}
