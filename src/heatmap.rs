use std::path::Path;

use crate::{
    core::{FrameIndex, Intensity},
    error::{SunlapseError, SunlapseResult},
    pipeline::partial_path,
};

/// Dense `(date position, frame)` grid of intensities, one column per date.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrightnessMatrix {
    dates: usize,
    frames_per_day: u64,
    /// Column-major: all frames of date 0, then date 1, ...
    cells: Vec<u8>,
}

impl BrightnessMatrix {
    pub fn new(dates: usize, frames_per_day: u64) -> Self {
        Self {
            dates,
            frames_per_day,
            cells: vec![0; dates * frames_per_day as usize],
        }
    }

    pub fn dates(&self) -> usize {
        self.dates
    }

    pub fn frames_per_day(&self) -> u64 {
        self.frames_per_day
    }

    fn index(&self, date_pos: usize, frame: FrameIndex) -> SunlapseResult<usize> {
        if date_pos >= self.dates || frame.0 >= self.frames_per_day {
            return Err(SunlapseError::validation(format!(
                "matrix cell ({date_pos}, {}) outside {}x{}",
                frame.0, self.dates, self.frames_per_day
            )));
        }
        Ok(date_pos * self.frames_per_day as usize + frame.0 as usize)
    }

    pub fn set(
        &mut self,
        date_pos: usize,
        frame: FrameIndex,
        intensity: Intensity,
    ) -> SunlapseResult<()> {
        let i = self.index(date_pos, frame)?;
        self.cells[i] = intensity.0;
        Ok(())
    }

    pub fn get(&self, date_pos: usize, frame: FrameIndex) -> SunlapseResult<Intensity> {
        Ok(Intensity(self.cells[self.index(date_pos, frame)?]))
    }

    /// All frames of one date, in frame order.
    pub fn column(&self, date_pos: usize) -> Option<&[u8]> {
        if date_pos >= self.dates {
            return None;
        }
        let fpd = self.frames_per_day as usize;
        Some(&self.cells[date_pos * fpd..(date_pos + 1) * fpd])
    }

    /// Every intensity that occurs at least once, ascending.
    pub fn distinct_intensities(&self) -> impl Iterator<Item = Intensity> + use<> {
        let mut seen = [false; 256];
        for &v in &self.cells {
            seen[usize::from(v)] = true;
        }
        Intensity::all().filter(move |i| seen[usize::from(i.0)])
    }
}

/// One pixel per cell: x is the date position, y the frame, value `255 - intensity`.
pub fn render(matrix: &BrightnessMatrix) -> SunlapseResult<image::GrayImage> {
    let width = u32::try_from(matrix.dates())
        .map_err(|_| SunlapseError::validation("too many dates for one heatmap image"))?;
    let height = u32::try_from(matrix.frames_per_day())
        .map_err(|_| SunlapseError::validation("frames_per_day too large for one heatmap image"))?;
    if width == 0 || height == 0 {
        return Err(SunlapseError::validation(
            "heatmap needs at least one date and one frame",
        ));
    }

    let mut img = image::GrayImage::new(width, height);
    for x in 0..width {
        let column = matrix
            .column(x as usize)
            .ok_or_else(|| SunlapseError::validation("matrix column missing (bug)"))?;
        for (y, &v) in column.iter().enumerate() {
            img.put_pixel(x, y as u32, image::Luma([Intensity(v).inverted().0]));
        }
    }
    Ok(img)
}

/// Write `img` as PNG straight to `path`; a failed write leaves nothing behind.
pub fn save_png(img: &image::GrayImage, path: &Path) -> SunlapseResult<()> {
    crate::encode_ffmpeg::ensure_parent_dir(path)?;
    if let Err(e) = img.save_with_format(path, image::ImageFormat::Png) {
        let _ = std::fs::remove_file(path);
        return Err(SunlapseError::Other(anyhow::Error::new(e).context(format!(
            "write heatmap '{}'",
            path.display()
        ))));
    }
    Ok(())
}

/// Write `img` as PNG through a temporary sibling, so `path` only ever holds a complete file.
pub fn write_png(img: &image::GrayImage, path: &Path) -> SunlapseResult<()> {
    let tmp = partial_path(path);
    save_png(img, &tmp)?;
    std::fs::rename(&tmp, path).map_err(|e| SunlapseError::io_at("publish heatmap", path, e))?;
    tracing::info!(path = %path.display(), "wrote heatmap");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_roundtrip_and_bounds() {
        let mut m = BrightnessMatrix::new(2, 3);
        m.set(1, FrameIndex(2), Intensity(77)).unwrap();
        assert_eq!(m.get(1, FrameIndex(2)).unwrap(), Intensity(77));
        assert_eq!(m.get(0, FrameIndex(2)).unwrap(), Intensity(0));
        assert!(m.set(2, FrameIndex(0), Intensity(1)).is_err());
        assert!(m.get(0, FrameIndex(3)).is_err());
        assert_eq!(m.column(1), Some(&[0u8, 0, 77][..]));
        assert_eq!(m.column(2), None);
    }

    #[test]
    fn distinct_intensities_lists_each_value_once() {
        let mut m = BrightnessMatrix::new(2, 3);
        m.set(0, FrameIndex(1), Intensity(200)).unwrap();
        m.set(1, FrameIndex(0), Intensity(200)).unwrap();
        m.set(1, FrameIndex(2), Intensity(9)).unwrap();
        let got: Vec<u8> = m.distinct_intensities().map(|i| i.0).collect();
        assert_eq!(got, vec![0, 9, 200]);
    }

    #[test]
    fn render_is_dates_by_frames_and_inverted() {
        let mut m = BrightnessMatrix::new(3, 4);
        m.set(0, FrameIndex(1), Intensity(255)).unwrap();
        m.set(2, FrameIndex(3), Intensity(100)).unwrap();

        let img = render(&m).unwrap();
        assert_eq!(img.dimensions(), (3, 4));
        assert_eq!(img.get_pixel(0, 0).0, [255]);
        assert_eq!(img.get_pixel(0, 1).0, [0]);
        assert_eq!(img.get_pixel(2, 3).0, [155]);
        assert_eq!(img.get_pixel(1, 2).0, [255]);
    }

    #[test]
    fn render_rejects_empty_matrix() {
        assert!(render(&BrightnessMatrix::new(0, 10)).is_err());
    }
}
