#![forbid(unsafe_code)]

mod rendering;

pub use rendering::{
    init_tracing, load_png_importance, output_dir, render_points_png, save_raster_png,
    write_points_file,
};
