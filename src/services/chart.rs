// src/services/chart.rs
//
// Chart descriptions for the dashboard, plus a small inline-SVG renderer.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write;

use crate::models::{ChartType, PriceSeries};

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 20.0;
const MARGIN_BOTTOM: f64 = 40.0;
const Y_TICKS: usize = 5;

const LINE_COLOR: &str = "#636efa";
const UP_COLOR: &str = "#2ca02c";
const DOWN_COLOR: &str = "#d62728";

/// Series to plot, oldest point first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Chart {
    Line {
        x: Vec<NaiveDate>,
        y: Vec<f64>,
    },
    Area {
        x: Vec<NaiveDate>,
        y: Vec<f64>,
    },
    Candlestick {
        x: Vec<NaiveDate>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
    },
}

/// Line and Area plot the daily high; Candle plots full OHLC bars.
pub fn build(series: &PriceSeries, chart_type: ChartType) -> Chart {
    let x: Vec<NaiveDate> = series.chronological().map(|r| r.date).collect();
    match chart_type {
        ChartType::Line => Chart::Line {
            x,
            y: series.chronological().map(|r| r.high).collect(),
        },
        ChartType::Area => Chart::Area {
            x,
            y: series.chronological().map(|r| r.high).collect(),
        },
        ChartType::Candle => Chart::Candlestick {
            x,
            open: series.chronological().map(|r| r.open).collect(),
            high: series.chronological().map(|r| r.high).collect(),
            low: series.chronological().map(|r| r.low).collect(),
            close: series.chronological().map(|r| r.close).collect(),
        },
    }
}

impl Chart {
    pub fn dates(&self) -> &[NaiveDate] {
        match self {
            Chart::Line { x, .. } | Chart::Area { x, .. } | Chart::Candlestick { x, .. } => x,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dates().is_empty()
    }

    fn value_range(&self) -> (f64, f64) {
        let values: Box<dyn Iterator<Item = f64> + '_> = match self {
            Chart::Line { y, .. } | Chart::Area { y, .. } => Box::new(y.iter().copied()),
            Chart::Candlestick { high, low, .. } => {
                Box::new(high.iter().chain(low.iter()).copied())
            }
        };
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !min.is_finite() {
            return (0.0, 1.0);
        }
        let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
        ((min - pad).max(0.0), max + pad)
    }

    /// Renders the chart as a standalone `<svg>` element.
    pub fn to_svg(&self, width: u32, height: u32) -> String {
        let frame = Frame::new(self, width as f64, height as f64);
        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="100%" role="img" class="chart">"#,
            w = width,
            h = height
        );

        frame.axes(&mut svg, self.dates());

        match self {
            Chart::Line { y, .. } => {
                let _ = write!(
                    svg,
                    r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
                    LINE_COLOR,
                    frame.points(y)
                );
            }
            Chart::Area { y, .. } => {
                if !y.is_empty() {
                    let baseline = frame.bottom();
                    let _ = write!(
                        svg,
                        r#"<path fill="{c}" fill-opacity="0.3" stroke="none" d="M{x0:.1},{b:.1} L{pts} L{xn:.1},{b:.1} Z"/>"#,
                        c = LINE_COLOR,
                        x0 = frame.x(0),
                        xn = frame.x(y.len() - 1),
                        b = baseline,
                        pts = frame.points(y).replace(' ', " L"),
                    );
                    let _ = write!(
                        svg,
                        r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
                        LINE_COLOR,
                        frame.points(y)
                    );
                }
            }
            Chart::Candlestick { open, high, low, close, .. } => {
                let body_width = (frame.step() * 0.7).max(1.0);
                for i in 0..open.len() {
                    let color = if close[i] >= open[i] { UP_COLOR } else { DOWN_COLOR };
                    let cx = frame.x(i);
                    let top = frame.y(open[i].max(close[i]));
                    let bottom = frame.y(open[i].min(close[i]));
                    let _ = write!(
                        svg,
                        r#"<line x1="{cx:.1}" x2="{cx:.1}" y1="{hi:.1}" y2="{lo:.1}" stroke="{color}"/>"#,
                        cx = cx,
                        hi = frame.y(high[i]),
                        lo = frame.y(low[i]),
                        color = color
                    );
                    let _ = write!(
                        svg,
                        r#"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" fill="{color}"/>"#,
                        x = cx - body_width / 2.0,
                        y = top,
                        w = body_width,
                        h = (bottom - top).max(1.0),
                        color = color
                    );
                }
            }
        }

        svg.push_str("</svg>");
        svg
    }
}

/// Maps data coordinates onto the SVG canvas.
struct Frame {
    width: f64,
    height: f64,
    count: usize,
    min: f64,
    max: f64,
}

impl Frame {
    fn new(chart: &Chart, width: f64, height: f64) -> Self {
        let (min, max) = chart.value_range();
        Frame {
            width,
            height,
            count: chart.dates().len().max(1),
            min,
            max,
        }
    }

    fn plot_width(&self) -> f64 {
        self.width - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn plot_height(&self) -> f64 {
        self.height - MARGIN_TOP - MARGIN_BOTTOM
    }

    fn bottom(&self) -> f64 {
        MARGIN_TOP + self.plot_height()
    }

    fn step(&self) -> f64 {
        self.plot_width() / self.count as f64
    }

    fn x(&self, index: usize) -> f64 {
        MARGIN_LEFT + (index as f64 + 0.5) * self.step()
    }

    fn y(&self, value: f64) -> f64 {
        MARGIN_TOP + (self.max - value) / (self.max - self.min) * self.plot_height()
    }

    fn points(&self, values: &[f64]) -> String {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{:.1},{:.1}", self.x(i), self.y(*v)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn axes(&self, svg: &mut String, dates: &[NaiveDate]) {
        let right = self.width - MARGIN_RIGHT;
        for tick in 0..Y_TICKS {
            let value = self.min + (self.max - self.min) * tick as f64 / (Y_TICKS - 1) as f64;
            let y = self.y(value);
            let _ = write!(
                svg,
                r##"<line x1="{l}" x2="{r}" y1="{y:.1}" y2="{y:.1}" stroke="#e5e5e5"/><text x="{tx}" y="{ty:.1}" font-size="11" text-anchor="end" fill="#555">{v:.2}</text>"##,
                l = MARGIN_LEFT,
                r = right,
                y = y,
                tx = MARGIN_LEFT - 6.0,
                ty = y + 4.0,
                v = value
            );
        }

        let mut labelled: Vec<usize> = vec![0, dates.len() / 2, dates.len().saturating_sub(1)];
        labelled.dedup();
        for i in labelled {
            if let Some(date) = dates.get(i) {
                let _ = write!(
                    svg,
                    r##"<text x="{x:.1}" y="{y:.1}" font-size="11" text-anchor="middle" fill="#555">{d}</text>"##,
                    x = self.x(i),
                    y = self.height - MARGIN_BOTTOM / 2.0,
                    d = date
                );
            }
        }
    }
}
