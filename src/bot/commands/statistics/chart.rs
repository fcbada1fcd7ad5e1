//! Chart generation for message stats.

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use image::ImageEncoder;
use plotters::prelude::*;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 400;
const BACKGROUND: RGBColor = RGBColor(50, 54, 60);
const LABEL_COLOUR: RGBColor = RGBColor(211, 211, 211);
const BAR_COLOUR: RGBColor = RGBColor(231, 76, 60);

/// Messages sent within `[start, end)`. The last bin also holds `end`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeBin {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: usize,
}

/// Splits the span of `times` into `bins` equal-width bins.
///
/// A single distinct time gets a one day span centred on it.
pub fn time_bins(times: &[DateTime<Utc>], bins: usize) -> Vec<TimeBin> {
    let (Some(min), Some(max)) = (times.iter().min(), times.iter().max()) else {
        return Vec::new();
    };
    if bins == 0 {
        return Vec::new();
    }

    let (start, end) = if min == max {
        (*min - Duration::hours(12), *max + Duration::hours(12))
    } else {
        (*min, *max)
    };
    let span = (end - start).num_milliseconds() as f64;
    let width = span / bins as f64;

    let mut counts = vec![0usize; bins];
    for time in times {
        let offset = (*time - start).num_milliseconds() as f64;
        let index = ((offset / width) as usize).min(bins - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| TimeBin {
            start: start + Duration::milliseconds((width * i as f64) as i64),
            end: start + Duration::milliseconds((width * (i + 1) as f64) as i64),
            count,
        })
        .collect()
}

/// Histogram of when a member sent their messages.
pub fn message_histogram(times: &[DateTime<Utc>]) -> anyhow::Result<Vec<u8>> {
    let bins = time_bins(times, 10);
    let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
        anyhow::bail!("no messages to plot");
    };
    let x_range = first.start.timestamp()..last.end.timestamp();
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0) + 1;

    let mut buffer = vec![0; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&BACKGROUND)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, 0..max_count)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_labels(bins.len() + 1)
            .x_label_formatter(&|ts| {
                DateTime::from_timestamp(*ts, 0)
                    .map(|dt| dt.format("%d %b").to_string())
                    .unwrap_or_default()
            })
            .label_style(("sans-serif", 15).into_font().color(&LABEL_COLOUR))
            .axis_style(LABEL_COLOUR)
            .draw()?;

        chart.draw_series(bins.iter().map(|bin| {
            Rectangle::new(
                [(bin.start.timestamp(), 0), (bin.end.timestamp(), bin.count)],
                BAR_COLOUR.mix(0.75).filled(),
            )
        }))?;

        root.present()?;
    }

    encode_png(&buffer)
}

/// Horizontal bar chart of `(label, count)` rows, first row on top.
pub fn activity_bars(rows: &[(String, i64)]) -> anyhow::Result<Vec<u8>> {
    if rows.is_empty() {
        anyhow::bail!("no rows to plot");
    }
    let n = rows.len() as i32;
    let max_count = rows.iter().map(|(_, c)| *c).max().unwrap_or(0).max(1);
    let label_of = |y: i32| -> String {
        let row = (n - 1 - y) as usize;
        rows.get(row).map(|(label, _)| label.clone()).unwrap_or_default()
    };

    let mut buffer = vec![0; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&BACKGROUND)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(30)
            .y_label_area_size(200)
            .build_cartesian_2d(0..max_count + max_count / 10 + 1, (0..n).into_segmented())?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .y_labels(rows.len())
            .y_label_formatter(&|v: &SegmentValue<i32>| match v {
                SegmentValue::CenterOf(y) => label_of(*y),
                _ => String::new(),
            })
            .label_style(("sans-serif", 15).into_font().color(&LABEL_COLOUR))
            .axis_style(LABEL_COLOUR)
            .draw()?;

        let data = rows
            .iter()
            .enumerate()
            .map(|(i, (_, count))| (n - 1 - i as i32, *count));
        chart.draw_series(
            Histogram::horizontal(&chart)
                .style(BAR_COLOUR.filled())
                .margin(2)
                .data(data),
        )?;

        root.present()?;
    }

    encode_png(&buffer)
}

fn encode_png(buffer: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut png_bytes);
    image::codecs::png::PngEncoder::new(&mut cursor).write_image(
        buffer,
        WIDTH,
        HEIGHT,
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_time_bins_counts_every_message() {
        let times = vec![at(1, 0), at(1, 5), at(3, 12), at(11, 0)];
        let bins = time_bins(&times, 10);

        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 4);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[9].count, 1);
        assert_eq!(bins[0].start, at(1, 0));
        assert_eq!(bins[9].end, at(11, 0));
    }

    #[test]
    fn test_time_bins_single_time() {
        let bins = time_bins(&[at(5, 12), at(5, 12)], 10);
        assert_eq!(bins.first().map(|b| b.start), Some(at(5, 0)));
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn test_time_bins_empty() {
        assert!(time_bins(&[], 10).is_empty());
    }
}
