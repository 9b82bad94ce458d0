//! Gauge for embedding coverage.

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Gauge},
    Frame,
};

pub struct ProgressBar {
    pub title: String,
    pub value: f64,
    pub max: f64,
    pub style: Style,
}

impl ProgressBar {
    pub fn ratio(&self) -> f64 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.value / self.max).clamp(0.0, 1.0)
        }
    }

    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let ratio = self.ratio();
        let gauge = Gauge::default()
            .block(Block::default().title(self.title.as_str()).borders(Borders::ALL))
            .gauge_style(self.style)
            .label(format!("{:.0} / {:.0} ({:.0}%)", self.value, self.max, ratio * 100.0))
            .ratio(ratio);
        f.render_widget(gauge, area);
    }
}
