use std::fs;
use std::path::PathBuf;

use fieldx::fxstruct;
use num_format::Locale;
use num_format::ToFormattedString;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::HPos;
use plotters::style::text_anchor::Pos;
use plotters::style::text_anchor::VPos;
use strum::Display;
use strum::EnumIter;
use strum::IntoEnumIterator;
use tracing::debug;
use tracing::instrument;

use crate::aggregate::Aggregates;
use crate::aggregate::CategoryAgePivot;
use crate::aggregate::CategoryShare;
use crate::aggregate::MonthlyRevenue;
use crate::aggregate::RankedRevenue;
use crate::aggregate::SpendingSummary;
use crate::types::Result;

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

const FONT: &str = "sans-serif";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum ChartKind {
    #[strum(serialize = "monthly revenue")]
    MonthlyRevenue,
    #[strum(serialize = "top products")]
    TopProducts,
    #[strum(serialize = "top customers")]
    TopCustomers,
    #[strum(serialize = "spending by gender")]
    GenderSpending,
    #[strum(serialize = "category/age heatmap")]
    CategoryAgeHeatmap,
    #[strum(serialize = "category share")]
    CategoryShare,
}

impl ChartKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ChartKind::MonthlyRevenue => "monthly_revenue.svg",
            ChartKind::TopProducts => "top_products.svg",
            ChartKind::TopCustomers => "top_customers.svg",
            ChartKind::GenderSpending => "gender_spending.svg",
            ChartKind::CategoryAgeHeatmap => "category_age_heatmap.svg",
            ChartKind::CategoryShare => "category_share.svg",
        }
    }

    /// Image size in pixels.
    pub fn size(&self) -> (u32, u32) {
        match self {
            ChartKind::MonthlyRevenue | ChartKind::TopProducts | ChartKind::TopCustomers => (1000, 500),
            ChartKind::GenderSpending => (800, 500),
            ChartKind::CategoryAgeHeatmap => (800, 600),
            ChartKind::CategoryShare => (600, 600),
        }
    }
}

/// Writes every aggregate as an SVG chart into [`output_dir`](Self::output_dir).
#[derive(Debug, Clone)]
#[fxstruct(no_new, builder, get(copy))]
pub struct ChartRenderer {
    #[fieldx(get(clone))]
    output_dir:   PathBuf,
    /// Year shown in the monthly revenue title.
    #[fieldx(default(2023))]
    year:         i32,
    #[fieldx(default(24.0))]
    caption_size: f64,
}

impl ChartRenderer {
    pub fn render_all(&self, aggregates: &Aggregates) -> Result<Vec<PathBuf>> {
        ChartKind::iter().map(|kind| self.render(kind, aggregates)).collect()
    }

    #[instrument(level = "debug", skip(self, aggregates))]
    pub fn render(&self, kind: ChartKind, aggregates: &Aggregates) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(kind.file_name());

        {
            let root = SVGBackend::new(&path, kind.size()).into_drawing_area();
            root.fill(&WHITE)?;

            match kind {
                ChartKind::MonthlyRevenue => self.draw_monthly_revenue(&root, &aggregates.monthly_revenue)?,
                ChartKind::TopProducts => self.draw_ranking(
                    &root,
                    &format!("Top {} Products by Revenue", aggregates.top_products.len()),
                    "Product ID",
                    &aggregates.top_products,
                )?,
                ChartKind::TopCustomers => self.draw_ranking(
                    &root,
                    &format!("Top {} Customers by Revenue", aggregates.top_customers.len()),
                    "Customer ID",
                    &aggregates.top_customers,
                )?,
                ChartKind::GenderSpending => self.draw_gender_spending(&root, &aggregates.gender_spending)?,
                ChartKind::CategoryAgeHeatmap => self.draw_heatmap(&root, &aggregates.category_age_pivot)?,
                ChartKind::CategoryShare => self.draw_category_share(&root, &aggregates.category_share)?,
            }

            root.present()?;
        }

        debug!("Chart written to {}", path.display());
        Ok(path)
    }

    fn caption_style(&self) -> TextStyle<'static> {
        (FONT, self.caption_size).into_font().into()
    }

    fn draw_no_data(&self, root: &Area<'_>, title: &str) -> Result<()> {
        let area = root.titled(title, self.caption_style())?;
        let (width, height) = area.dim_in_pixel();
        area.draw(&Text::new(
            "No data",
            (width as i32 / 2, height as i32 / 2),
            text_style(16.0, &BLACK, HPos::Center, VPos::Center),
        ))?;
        Ok(())
    }

    fn draw_monthly_revenue(&self, root: &Area<'_>, monthly: &[MonthlyRevenue]) -> Result<()> {
        let title = format!("Monthly Revenue ({})", self.year);
        if monthly.is_empty() {
            return self.draw_no_data(root, &title);
        }

        let labels: Vec<&str> = monthly.iter().map(|m| m.month.as_str()).collect();
        let y_max = headroom(monthly.iter().map(|m| m.revenue).max().unwrap_or(0));

        let mut chart = ChartBuilder::on(root)
            .caption(&title, self.caption_style())
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(90)
            .build_cartesian_2d((0u32..labels.len() as u32 - 1).into_segmented(), 0u64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len())
            .x_label_formatter(&|v: &SegmentValue<u32>| segment_label(v, &labels))
            .y_label_formatter(&|v: &u64| thousands(*v))
            .x_desc("order_month")
            .y_desc("total_price")
            .draw()?;

        let points = || {
            monthly
                .iter()
                .enumerate()
                .map(|(idx, m)| (SegmentValue::CenterOf(idx as u32), m.revenue))
        };

        chart.draw_series(LineSeries::new(points(), BLUE.stroke_width(2)))?;
        chart.draw_series(points().map(|point| Circle::new(point, 4, BLUE.filled())))?;

        Ok(())
    }

    fn draw_ranking(&self, root: &Area<'_>, title: &str, x_desc: &str, ranking: &[RankedRevenue]) -> Result<()> {
        if ranking.is_empty() {
            return self.draw_no_data(root, title);
        }

        let labels: Vec<String> = ranking.iter().map(|r| r.id.to_string()).collect();
        let y_max = headroom(ranking.iter().map(|r| r.revenue).max().unwrap_or(0));

        let mut chart = ChartBuilder::on(root)
            .caption(title, self.caption_style())
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(90)
            .build_cartesian_2d((0u32..labels.len() as u32 - 1).into_segmented(), 0u64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len())
            .x_label_formatter(&|v: &SegmentValue<u32>| segment_label(v, &labels))
            .y_label_formatter(&|v: &u64| thousands(*v))
            .x_desc(x_desc)
            .y_desc("Revenue")
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.75).filled())
                .margin(10)
                .data(ranking.iter().enumerate().map(|(idx, r)| (idx as u32, r.revenue))),
        )?;

        Ok(())
    }

    fn draw_gender_spending(&self, root: &Area<'_>, spending: &[SpendingSummary]) -> Result<()> {
        let title = "Spending per Order by Gender";
        if spending.is_empty() {
            return self.draw_no_data(root, title);
        }

        let names: Vec<String> = spending.iter().map(|s| s.gender.to_string()).collect();
        let y_max = spending.iter().map(|s| s.max).fold(0.0, f64::max).max(1.0) * 1.05;

        let mut chart = ChartBuilder::on(root)
            .caption(title, self.caption_style())
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(80)
            .build_cartesian_2d(-0.5f64..(spending.len() as f64 - 0.5), 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(spending.len() * 2 + 1)
            .x_label_formatter(&|x: &f64| {
                let idx = x.round();
                if (x - idx).abs() < 1e-6 && idx >= 0.0 {
                    names.get(idx as usize).cloned().unwrap_or_default()
                }
                else {
                    String::new()
                }
            })
            .y_label_formatter(&|v: &f64| thousands(v.round() as u64))
            .x_desc("gender")
            .y_desc("total_price")
            .draw()?;

        const HALF_BOX: f64 = 0.3;
        const HALF_CAP: f64 = 0.12;

        for (idx, summary) in spending.iter().enumerate() {
            let x = idx as f64;
            let color = Palette99::pick(idx);

            chart.draw_series(std::iter::once(Rectangle::new(
                [(x - HALF_BOX, summary.q1), (x + HALF_BOX, summary.q3)],
                color.mix(0.6).filled(),
            )))?;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x - HALF_BOX, summary.q1), (x + HALF_BOX, summary.q3)],
                BLACK.stroke_width(1),
            )))?;

            let median = vec![(x - HALF_BOX, summary.median), (x + HALF_BOX, summary.median)];
            let whiskers = [
                vec![(x, summary.q1), (x, summary.whisker_low)],
                vec![(x, summary.q3), (x, summary.whisker_high)],
                vec![(x - HALF_CAP, summary.whisker_low), (x + HALF_CAP, summary.whisker_low)],
                vec![(x - HALF_CAP, summary.whisker_high), (x + HALF_CAP, summary.whisker_high)],
            ];

            chart.draw_series(std::iter::once(PathElement::new(median, BLACK.stroke_width(2))))?;
            chart.draw_series(whiskers.into_iter().map(|line| PathElement::new(line, BLACK.stroke_width(1))))?;
            chart.draw_series(
                summary
                    .outliers
                    .iter()
                    .map(|v| Circle::new((x, *v), 3, BLACK.stroke_width(1))),
            )?;
        }

        Ok(())
    }

    fn draw_heatmap(&self, root: &Area<'_>, pivot: &CategoryAgePivot) -> Result<()> {
        let title = "Revenue by Category and Age Group";
        if pivot.categories().is_empty() {
            return self.draw_no_data(root, title);
        }

        let area = root.titled(title, self.caption_style())?;
        let (width, height) = area.dim_in_pixel();
        let (left, right, top, bottom) = (120, 30, 10, 70);
        let rows = pivot.categories().len() as i32;
        let cols = pivot.age_groups().len() as i32;
        let cell_w = (width as i32 - left - right) / cols;
        let cell_h = (height as i32 - top - bottom) / rows;
        let max = pivot.max_cell().max(1) as f64;

        for (row, (category, cells)) in pivot.categories().iter().zip(pivot.cells()).enumerate() {
            let y0 = top + row as i32 * cell_h;

            for (col, value) in cells.iter().enumerate() {
                let x0 = left + col as i32 * cell_w;
                let intensity = *value as f64 / max;
                let text_color = if intensity > 0.55 { WHITE } else { BLACK };

                area.draw(&Rectangle::new(
                    [(x0, y0), (x0 + cell_w, y0 + cell_h)],
                    blues(intensity).filled(),
                ))?;
                area.draw(&Text::new(
                    value.to_string(),
                    (x0 + cell_w / 2, y0 + cell_h / 2),
                    text_style(14.0, &text_color, HPos::Center, VPos::Center),
                ))?;
            }

            area.draw(&Text::new(
                category.to_string(),
                (left - 8, y0 + cell_h / 2),
                text_style(14.0, &BLACK, HPos::Right, VPos::Center),
            ))?;
        }

        let grid_bottom = top + rows * cell_h;
        for (col, age_group) in pivot.age_groups().iter().enumerate() {
            area.draw(&Text::new(
                age_group.to_string(),
                (left + col as i32 * cell_w + cell_w / 2, grid_bottom + 8),
                text_style(14.0, &BLACK, HPos::Center, VPos::Top),
            ))?;
        }

        area.draw(&Text::new(
            "age_group",
            (left + cols * cell_w / 2, grid_bottom + 40),
            text_style(15.0, &BLACK, HPos::Center, VPos::Top),
        ))?;

        Ok(())
    }

    fn draw_category_share(&self, root: &Area<'_>, shares: &[CategoryShare]) -> Result<()> {
        let title = "Sales Share by Category";
        if shares.iter().all(|s| s.revenue == 0) {
            return self.draw_no_data(root, title);
        }

        let area = root.titled(title, self.caption_style())?;
        let (width, height) = area.dim_in_pixel();
        let center = (width as i32 / 2, height as i32 / 2);
        let radius = width.min(height) as f64 * 0.33;

        // Slices go counterclockwise from 12 o'clock.
        let mut start = 90.0f64;

        for (idx, share) in shares.iter().enumerate() {
            if share.share <= 0.0 {
                continue;
            }

            let sweep = share.share * 360.0;
            let steps = sweep.ceil().max(1.0) as usize;
            let mut outline = Vec::with_capacity(steps + 2);
            outline.push(center);
            for step in 0..=steps {
                outline.push(polar(center, radius, start + sweep * step as f64 / steps as f64));
            }

            area.draw(&Polygon::new(outline, Palette99::pick(idx).filled()))?;

            let middle = start + sweep / 2.0;
            let hpos = match middle.to_radians().cos() {
                c if c > 0.1 => HPos::Left,
                c if c < -0.1 => HPos::Right,
                _ => HPos::Center,
            };

            area.draw(&Text::new(
                format!("{:.1}%", share.share * 100.0),
                polar(center, radius * 0.6, middle),
                text_style(14.0, &BLACK, HPos::Center, VPos::Center),
            ))?;
            area.draw(&Text::new(
                share.category.to_string(),
                polar(center, radius * 1.1, middle),
                text_style(15.0, &BLACK, hpos, VPos::Center),
            ))?;

            start += sweep;
        }

        Ok(())
    }
}

fn text_style(size: f64, color: &RGBColor, hpos: HPos, vpos: VPos) -> TextStyle<'static> {
    (FONT, size).into_font().color(color).pos(Pos::new(hpos, vpos))
}

fn segment_label<S: AsRef<str>>(value: &SegmentValue<u32>, labels: &[S]) -> String {
    match value {
        SegmentValue::CenterOf(idx) => labels
            .get(*idx as usize)
            .map(|l| l.as_ref().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn thousands(value: u64) -> String {
    value.to_formatted_string(&Locale::en)
}

// Leave some room above the highest value.
fn headroom(max: u64) -> u64 {
    (max + max / 10).max(1)
}

/// Point at `angle` degrees, counterclockwise from 3 o'clock, in screen coordinates.
fn polar(center: (i32, i32), radius: f64, angle: f64) -> (i32, i32) {
    let angle = angle.to_radians();
    (
        center.0 + (radius * angle.cos()).round() as i32,
        center.1 - (radius * angle.sin()).round() as i32,
    )
}

/// Sequential white-to-blue color scale, `intensity` in 0.0..=1.0
fn blues(intensity: f64) -> RGBColor {
    const LOW: (f64, f64, f64) = (247.0, 251.0, 255.0);
    const HIGH: (f64, f64, f64) = (8.0, 48.0, 107.0);
    let t = intensity.clamp(0.0, 1.0);
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(lerp(LOW.0, HIGH.0), lerp(LOW.1, HIGH.1), lerp(LOW.2, HIGH.2))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::aggregate::DEFAULT_TOP;
    use crate::frame::SalesFrame;
    use crate::generator::DataGenerator;

    fn renderer(dir: &std::path::Path) -> ChartRenderer {
        ChartRenderer::builder().output_dir(dir.to_path_buf()).build().unwrap()
    }

    #[test]
    fn test_render_all() {
        let dir = tempfile::tempdir().unwrap();
        let frame = SalesFrame::join(&DataGenerator::builder().build().unwrap().generate().unwrap());
        let aggregates = Aggregates::compute(&frame, DEFAULT_TOP);

        let paths = renderer(dir.path()).render_all(&aggregates).unwrap();
        assert_eq!(paths.len(), ChartKind::iter().count());

        for kind in ChartKind::iter() {
            let path = dir.path().join(kind.file_name());
            let svg = fs::read_to_string(&path).unwrap();
            assert!(svg.starts_with("<svg"), "{} is not an SVG", path.display());
        }

        let monthly = fs::read_to_string(dir.path().join(ChartKind::MonthlyRevenue.file_name())).unwrap();
        assert!(monthly.contains("Monthly Revenue (2023)"));
        let heatmap = fs::read_to_string(dir.path().join(ChartKind::CategoryAgeHeatmap.file_name())).unwrap();
        assert!(heatmap.contains("46-60"));
    }

    #[test]
    fn test_year_in_title() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = DataGenerator::builder().year(2024).build().unwrap().generate().unwrap();
        let aggregates = Aggregates::compute(&SalesFrame::join(&dataset), DEFAULT_TOP);
        let renderer = ChartRenderer::builder()
            .output_dir(dir.path().to_path_buf())
            .year(2024)
            .build()
            .unwrap();

        let path = renderer.render(ChartKind::MonthlyRevenue, &aggregates).unwrap();
        let svg = fs::read_to_string(path).unwrap();
        assert!(svg.contains("Monthly Revenue (2024)"));
        assert!(!svg.contains("2023-"));
    }

    #[test]
    fn test_render_empty() {
        let dir = tempfile::tempdir().unwrap();
        let aggregates = Aggregates::compute(&SalesFrame::default(), DEFAULT_TOP);

        let paths = renderer(&dir.path().join("nested")).render_all(&aggregates).unwrap();
        for path in paths {
            assert!(fs::read_to_string(path).unwrap().contains("No data"));
        }
    }

    #[test]
    fn test_helpers() {
        assert_eq!(thousands(1_234_567), "1,234,567");
        assert_eq!(headroom(0), 1);
        assert_eq!(headroom(1000), 1100);
        assert_eq!(polar((100, 100), 10.0, 90.0), (100, 90));
        assert_eq!(blues(0.0), RGBColor(247, 251, 255));
        assert_eq!(blues(1.0), RGBColor(8, 48, 107));
        assert_eq!(segment_label(&SegmentValue::CenterOf(1), &["a", "b"]), "b");
        assert_eq!(segment_label(&SegmentValue::Exact(1), &["a", "b"]), "");
    }
}
