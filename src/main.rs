use std::{error::Error, fs, path::PathBuf};

use clap::Parser;
use dicom_mpr::{
    DEFAULT_MAX_DISPLAY_DIM, DisplayImage, Orientation, ResampleFilter, ViewerSession,
    WindowParams,
};
use image::{Rgb, RgbImage};
use log::info;

#[derive(Debug, clap::ValueEnum, Clone, Copy)]
enum ArgFilter {
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl From<ArgFilter> for ResampleFilter {
    fn from(filter: ArgFilter) -> Self {
        match filter {
            ArgFilter::Bilinear => ResampleFilter::Bilinear,
            ArgFilter::CatmullRom => ResampleFilter::CatmullRom,
            ArgFilter::Lanczos3 => ResampleFilter::Lanczos3,
        }
    }
}

/// Render the axial, coronal and sagittal views of a DICOM series.
#[derive(Parser, Debug)]
struct Args {
    /// Directory holding the .dcm files
    dicom_dir: PathBuf,
    /// Where axial.png, coronal.png and sagittal.png are written
    #[arg(long, default_value = ".")]
    out: PathBuf,
    /// Sagittal slice, centre if not given
    #[arg(long)]
    x: Option<usize>,
    /// Coronal slice, centre if not given
    #[arg(long)]
    y: Option<usize>,
    /// Axial slice, centre if not given
    #[arg(long)]
    z: Option<usize>,
    #[arg(long, default_value_t = WindowParams::default().level, allow_hyphen_values = true,
          value_parser = clap::value_parser!(i32).range(-1000..=3000))]
    level: i32,
    #[arg(long, default_value_t = WindowParams::default().width,
          value_parser = clap::value_parser!(i32).range(1..=4000))]
    width: i32,
    #[arg(long, default_value_t = DEFAULT_MAX_DISPLAY_DIM)]
    max_dim: u32,
    #[arg(long, value_enum, default_value = "catmull-rom")]
    filter: ArgFilter,
}

fn plane_colour(orientation: Orientation) -> Rgb<u8> {
    match orientation {
        Orientation::Axial => Rgb([255, 50, 50]),
        Orientation::Coronal => Rgb([50, 255, 50]),
        Orientation::Sagittal => Rgb([50, 100, 255]),
    }
}

/// Colours of the (vertical, horizontal) crosshair lines: each line takes
/// the colour of the plane it marks.
fn line_colours(orientation: Orientation) -> (Rgb<u8>, Rgb<u8>) {
    match orientation {
        Orientation::Axial => (
            plane_colour(Orientation::Sagittal),
            plane_colour(Orientation::Coronal),
        ),
        Orientation::Coronal => (
            plane_colour(Orientation::Sagittal),
            plane_colour(Orientation::Axial),
        ),
        Orientation::Sagittal => (
            plane_colour(Orientation::Coronal),
            plane_colour(Orientation::Axial),
        ),
    }
}

fn compose(view: &DisplayImage, orientation: Orientation) -> RgbImage {
    let (width, height) = view.image.dimensions();
    let mut rgb = RgbImage::from_fn(width, height, |x, y| {
        let grey = view.image.get_pixel(x, y).0[0];
        Rgb([grey, grey, grey])
    });

    if let Some(crosshair) = view.crosshair {
        let (vertical, horizontal) = line_colours(orientation);
        let line_x = ((width as f64 * crosshair.x) as u32).min(width - 1);
        let line_y = ((height as f64 * crosshair.y) as u32).min(height - 1);
        for y in 0..height {
            rgb.put_pixel(line_x, y, vertical);
        }
        for x in 0..width {
            rgb.put_pixel(x, line_y, horizontal);
        }
    }
    rgb
}

fn main() -> Result<(), Box<dyn Error + Sync + Send>> {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    let args = Args::parse();

    let mut session = ViewerSession::new();
    session.load_from_directory(&args.dicom_dir)?;
    if let Some(summary) = session.summary() {
        info!("loaded {}:\n{summary}", args.dicom_dir.display());
    }

    for (orientation, index) in [
        (Orientation::Sagittal, args.x),
        (Orientation::Coronal, args.y),
        (Orientation::Axial, args.z),
    ] {
        if let Some(index) = index {
            let clamped = session.set_index(orientation, index)?;
            if clamped != index {
                info!("{orientation} slice {index} clamped to {clamped}");
            }
        }
    }
    session.set_window(WindowParams::new(args.level, args.width));

    let views = session.refresh(args.max_dim, args.filter.into())?;
    fs::create_dir_all(&args.out)?;
    for orientation in Orientation::ALL {
        let path = args.out.join(format!("{orientation}.png"));
        compose(views.get(orientation), orientation).save(&path)?;
        info!("wrote {}", path.display());
    }

    Ok(())
}
