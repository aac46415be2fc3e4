//! Terminal styles from utility class strings.
//!
//! Status bar widgets describe their look with merged class strings
//! (see [`cn!`](crate::cn)); this turns the supported subset into a ratatui
//! [`Style`]. Unknown classes are ignored.

use crate::engine::style::Rgb;
use ratatui::style::{Color, Modifier, Style};

pub fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

pub fn style(classes: &str) -> Style {
    classes.split_whitespace().fold(Style::default(), |style, class| {
        if let Some(value) = class.strip_prefix("text-") {
            color(value).map_or(style, |c| style.fg(c))
        } else if let Some(value) = class.strip_prefix("bg-") {
            color(value).map_or(style, |c| style.bg(c))
        } else {
            match class {
                "font-bold" | "font-semibold" | "font-extrabold" => style.add_modifier(Modifier::BOLD),
                "font-normal" => style.remove_modifier(Modifier::BOLD),
                "italic" => style.add_modifier(Modifier::ITALIC),
                "not-italic" => style.remove_modifier(Modifier::ITALIC),
                "underline" => style.add_modifier(Modifier::UNDERLINED),
                "no-underline" => style.remove_modifier(Modifier::UNDERLINED),
                "line-through" => style.add_modifier(Modifier::CROSSED_OUT),
                c if c.starts_with("opacity-") => match c["opacity-".len()..].parse::<u8>() {
                    Ok(v) if v < 100 => style.add_modifier(Modifier::DIM),
                    _ => style,
                },
                _ => style,
            }
        }
    })
}

/// `red-500`, `white`, `[#328ffd]`
fn color(value: &str) -> Option<Color> {
    if let Some(hex) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        return Rgb::parse(hex).map(rgb);
    }
    let (name, shade) = match value.rsplit_once('-') {
        Some((name, shade)) => (name, shade.parse::<u16>().ok()?),
        None => (value, 500),
    };
    let light = shade < 400;
    let pick = |normal: Color, lighter: Color| Some(if light { lighter } else { normal });
    match name {
        "white" => Some(Color::White),
        "black" => Some(Color::Black),
        "slate" | "gray" | "zinc" | "neutral" | "stone" => pick(Color::DarkGray, Color::Gray),
        "red" | "rose" | "orange" => pick(Color::Red, Color::LightRed),
        "green" | "emerald" | "lime" => pick(Color::Green, Color::LightGreen),
        "blue" | "sky" | "indigo" => pick(Color::Blue, Color::LightBlue),
        "yellow" | "amber" => pick(Color::Yellow, Color::LightYellow),
        "cyan" | "teal" => pick(Color::Cyan, Color::LightCyan),
        "purple" | "violet" | "fuchsia" | "pink" => pick(Color::Magenta, Color::LightMagenta),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cn;

    #[test]
    fn test_colors_and_modifiers() {
        let s = style("text-red-500 bg-gray-200 font-bold");
        assert_eq!(s.fg, Some(Color::Red));
        assert_eq!(s.bg, Some(Color::Gray));
        assert!(s.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_arbitrary_hex_and_unknown_classes() {
        let s = style("text-[#328ffd] flex p-2 text-banana-500");
        assert_eq!(s.fg, Some(Color::Rgb(0x32, 0x8f, 0xfd)));
        assert_eq!(style("opacity-50").add_modifier, Modifier::DIM);
    }

    #[test]
    fn test_merged_classes_pick_last_color() {
        let active = false;
        let s = style(&cn!("text-green-500 font-bold", ("text-gray-500 font-normal", !active)));
        assert_eq!(s.fg, Some(Color::DarkGray));
        assert!(!s.add_modifier.contains(Modifier::BOLD));
    }
}
