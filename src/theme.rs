use ratatui::style::Color;

/// Palette for the full-screen UI.
#[derive(Debug)]
pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "midnight",
    bg: Color::Rgb(22, 24, 33),
    fg: Color::Rgb(205, 214, 244),
    accent: Color::Rgb(137, 180, 250),
    muted: Color::Rgb(108, 112, 134),
    border: Color::Rgb(69, 71, 90),
    highlight_fg: Color::Rgb(22, 24, 33),
    highlight_bg: Color::Rgb(137, 180, 250),
    stripe_bg: Color::Rgb(30, 32, 44),
    status: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
    key_fg: Color::Rgb(22, 24, 33),
    key_bg: Color::Rgb(108, 112, 134),
  },
  Theme {
    name: "pastel",
    bg: Color::Rgb(253, 246, 240),
    fg: Color::Rgb(76, 79, 105),
    accent: Color::Rgb(210, 120, 160),
    muted: Color::Rgb(140, 143, 161),
    border: Color::Rgb(204, 208, 218),
    highlight_fg: Color::Rgb(253, 246, 240),
    highlight_bg: Color::Rgb(210, 120, 160),
    stripe_bg: Color::Rgb(245, 236, 230),
    status: Color::Rgb(64, 160, 43),
    error: Color::Rgb(210, 15, 57),
    key_fg: Color::Rgb(253, 246, 240),
    key_bg: Color::Rgb(140, 143, 161),
  },
  Theme {
    name: "terminal",
    bg: Color::Reset,
    fg: Color::Reset,
    accent: Color::Cyan,
    muted: Color::DarkGray,
    border: Color::DarkGray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Cyan,
    stripe_bg: Color::Reset,
    status: Color::Green,
    error: Color::Red,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

/// Index of the theme called `name`, falling back to the first one.
pub fn index_of(name: &str) -> usize {
  THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(name)).unwrap_or(0)
}
