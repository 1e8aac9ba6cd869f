use crate::format::{BirdState, SimulationHeader};
use crate::quiver::Quiver;
use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// Square bitmap animation receiving one frame per timestep.
pub type Animation = DrawingArea<BitMapBackend<'static>, Shift>;

/// Open a GIF that gains one frame, shown for `frame_delay_ms`, per [`draw_timestep`].
pub fn open_animation<P: AsRef<Path>>(file: P, size: u32, frame_delay_ms: u32) -> Result<Animation> {
    let file = file.as_ref();
    let backend = BitMapBackend::gif(file, (size, size), frame_delay_ms)
        .with_context(|| format!("failed to create {file:?}"))?;
    Ok(backend.into_drawing_area())
}

/// Clear the surface and draw one timestep as a field of arrows.
///
/// The view is fixed to the square domain and carries no ticks or labels.
pub fn draw_timestep<DB>(
    root: &DrawingArea<DB, Shift>,
    header: &SimulationHeader,
    birds: &[BirdState],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("failed to clear canvas")?;

    let (width, _) = root.dim_in_pixel();
    let side = header.domain_size;
    let mut chart = ChartBuilder::on(root)
        .margin(width / 32)
        .build_cartesian_2d(0.0..side, 0.0..side)
        .context("failed to build chart")?;

    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(0.0, 0.0), (side, side)],
            BLACK.stroke_width(1),
        )))
        .context("failed to draw frame border")?;

    let quiver = Quiver::autoscale(birds, side);
    chart
        .draw_series(
            birds
                .iter()
                .filter_map(|bird| quiver.arrow(bird))
                .map(|arrow| Polygon::new(arrow.outline().to_vec(), BLACK.filled())),
        )
        .context("failed to draw arrows")?;

    root.present().context("failed to present frame")?;

    Ok(())
}

/// Draw one timestep into a standalone image file.
pub fn draw_frame<P: AsRef<Path>>(
    file: P,
    size: u32,
    header: &SimulationHeader,
    birds: &[BirdState],
) -> Result<()> {
    let file = file.as_ref();
    let root = BitMapBackend::new(file, (size, size)).into_drawing_area();
    draw_timestep(&root, header, birds).with_context(|| format!("failed to write {file:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_dir;
    use std::fs;

    #[test]
    fn writes_square_png() {
        let file = test_dir("writes_square_png").join("frame.png");

        let header = SimulationHeader::parse("1 2 10.0 0.2").unwrap();
        let birds = [
            BirdState::new(2.0, 3.0, 1.0, 0.0),
            BirdState::new(7.5, 9.9, -0.6, 0.8),
        ];
        draw_frame(&file, 64, &header, &birds).unwrap();

        let bytes = fs::read(&file).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        // IHDR width and height.
        assert_eq!(&bytes[16..24], &[0, 0, 0, 64, 0, 0, 0, 64]);
    }

    #[test]
    fn empty_timestep_still_draws() {
        let file = test_dir("empty_timestep_still_draws").join("empty.png");

        let header = SimulationHeader::parse("1 1 4.0 1.0").unwrap();
        draw_frame(&file, 32, &header, &[]).unwrap();
        assert!(file.is_file());
    }

    #[test]
    fn animation_is_a_gif() {
        let file = test_dir("animation_is_a_gif").join("flock.gif");

        let header = SimulationHeader::parse("2 1 4.0 1.0").unwrap();
        let animation = open_animation(&file, 40, 200).unwrap();
        draw_timestep(&animation, &header, &[BirdState::new(1.0, 1.0, 1.0, 0.0)]).unwrap();
        draw_timestep(&animation, &header, &[BirdState::new(2.0, 1.0, 1.0, 0.0)]).unwrap();
        drop(animation);

        let bytes = fs::read(&file).unwrap();
        assert_eq!(&bytes[..6], b"GIF89a");
        // Logical screen width and height, little endian.
        assert_eq!(&bytes[6..10], &[40, 0, 40, 0]);
    }
}
