use crate::app::App;
use crate::cn;
use crate::engine::style::{CLUSTER, CLUSTER_ID, POINT_COUNT_ABBREVIATED};
use crate::engine::{Cursor, MapHandle, RenderedMap};
use crate::theme::{rgb, style};
use crate::utils::remove_keys;
use geojson::JsonObject;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Feature properties that only matter to the engine
const INTERNAL_PROPERTIES: &[&str] = &[CLUSTER, CLUSTER_ID, POINT_COUNT_ABBREVIATED];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let map = app.map();
    let title_class = cn!("text-cyan-500 font-bold", ("text-yellow-500", map.is_animating()));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style("text-gray-500"))
        .title(Span::styled(" Project Map ", style(&title_class)));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(
        MapWidget {
            rendered: map.render(),
            pointer: map.cursor() == Cursor::Pointer,
            hover_cell: app.last_hover,
        },
        inner,
    );
}

/// Braille strokes with text labels on top
struct MapWidget {
    rendered: RenderedMap,
    pointer: bool,
    hover_cell: Option<(u16, u16)>,
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for stroke in &self.rendered.strokes {
            let color = rgb(stroke.color);
            for (cx, cy, ch) in stroke.canvas.glyphs() {
                if cx >= area.width as usize || cy >= area.height as usize {
                    continue;
                }
                buf[(area.x + cx as u16, area.y + cy as u16)].set_char(ch).set_fg(color);
            }
        }

        for label in &self.rendered.labels {
            if label.row >= area.height || label.col >= area.width {
                continue;
            }
            let label_style = Style::default().fg(rgb(label.color)).add_modifier(Modifier::BOLD);
            let max_len = (area.width - label.col) as usize;
            for (i, ch) in label.text.chars().take(max_len).enumerate() {
                buf[(area.x + label.col + i as u16, area.y + label.row)]
                    .set_char(ch)
                    .set_style(label_style);
            }
        }

        // Terminals have no pointer cursor; mark the hovered cell instead
        if let Some((col, row)) = self.hover_cell {
            let (x, y) = (col.saturating_sub(1), row.saturating_sub(1));
            if x < area.width && y < area.height {
                let (ch, color) = if self.pointer { ('◉', Color::Yellow) } else { ('╋', Color::Red) };
                buf[(area.x + x, area.y + y)].set_char(ch).set_fg(color);
            }
        }
    }
}

/// `key=value` pairs of the hovered feature, engine-only keys removed
pub fn hover_summary(properties: &JsonObject) -> String {
    remove_keys(properties, INTERNAL_PROPERTIES)
        .into_iter()
        .map(|(key, value)| match value.as_str() {
            Some(s) => format!("{key}={s}"),
            None => format!("{key}={value}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn toggle(label: &str, on: bool) -> Span<'static> {
    let class = cn!("text-gray-500", ("text-green-500 font-bold", on));
    Span::styled(format!("{label} "), style(&class))
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let muted = style("text-gray-500");
    let mut spans = vec![
        Span::styled(" ", muted),
        Span::styled(app.zoom_level(), style("text-yellow-500")),
        Span::styled(" | ", muted),
        toggle("[a]rea", app.show_area),
        toggle("[s]plit", app.show_split),
        toggle("[c]lusters", app.show_clusters),
        Span::styled(format!("| {} pts {} tasks @{} m ", app.point_count(), app.split_cells(), app.split_meters), muted),
        Span::styled("| ", muted),
        Span::styled(app.center_coords(), style("text-cyan-500")),
    ];

    if let Some(props) = &app.hovered {
        spans.push(Span::styled(" | ", muted));
        spans.push(Span::styled(hover_summary(props), style("text-white")));
    } else if let Some(notice) = &app.notice {
        spans.push(Span::styled(" | ", muted));
        spans.push(Span::styled(notice.clone(), style("text-purple-300 italic")));
    }
    spans.push(Span::styled(" | hjkl:pan +/-:zoom [/]:split f:fit q:quit", muted));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
