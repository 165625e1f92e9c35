//! Text styles shared by the ffmpeg and browser renderers.

/// Vertical placement of the text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Top,
    Center,
    Bottom,
}

impl Position {
    /// `drawtext` y expression.
    pub fn ffmpeg_y(&self) -> &'static str {
        match self {
            Self::Top => "20",
            Self::Center => "(h-text_h)/2",
            Self::Bottom => "h-text_h-20",
        }
    }

    /// CSS `justify-content` for a column flexbox.
    pub fn css_justify(&self) -> &'static str {
        match self {
            Self::Top => "flex-start",
            Self::Center => "center",
            Self::Bottom => "flex-end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn to_ffmpeg(&self) -> String {
        format!("0x{:02x}{:02x}{:02x}@{:.2}", self.r, self.g, self.b, self.a)
    }

    pub fn to_css(&self) -> String {
        format!("rgba({},{},{},{:.2})", self.r, self.g, self.b, self.a)
    }
}

const WHITE: Rgba = Rgba::rgb(255, 255, 255);
const BLACK: Rgba = Rgba::rgb(0, 0, 0);

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub name: &'static str,
    pub font_size: u32,
    pub color: Rgba,
    pub border_color: Rgba,
    pub border_width: u32,
    pub position: Position,
    /// Translucent box behind the text.
    pub box_color: Option<Rgba>,
}

impl TextStyle {
    pub const NAMES: [&'static str; 6] = ["meme", "title", "caption", "watermark", "comic", "neon"];

    /// Look up a named style (case-insensitive).
    pub fn named(name: &str) -> Option<Self> {
        let base = Self::meme();
        let style = match name.to_lowercase().as_str() {
            "meme" => base,
            "title" => Self {
                name: "title",
                font_size: 48,
                ..base
            },
            "caption" => Self {
                name: "caption",
                font_size: 32,
                position: Position::Center,
                border_width: 0,
                box_color: Some(BLACK.with_alpha(0.5)),
                ..base
            },
            "watermark" => Self {
                name: "watermark",
                font_size: 24,
                color: WHITE.with_alpha(0.7),
                border_width: 1,
                position: Position::Bottom,
                ..base
            },
            "comic" => Self {
                name: "comic",
                font_size: 36,
                border_width: 4,
                position: Position::Center,
                ..base
            },
            "neon" => Self {
                name: "neon",
                font_size: 42,
                color: Rgba::rgb(0, 255, 0),
                border_color: Rgba::rgb(0, 80, 0),
                border_width: 2,
                position: Position::Center,
                ..base
            },
            _ => return None,
        };
        Some(style)
    }

    /// Default overlay style.
    pub fn meme() -> Self {
        Self {
            name: "meme",
            font_size: 40,
            color: WHITE,
            border_color: BLACK,
            border_width: 3,
            position: Position::Top,
            box_color: None,
        }
    }

    /// Large centered text used for text-only stickers.
    pub fn plain(font_size: u32) -> Self {
        Self {
            name: "plain",
            font_size,
            border_width: 2,
            position: Position::Center,
            ..Self::meme()
        }
    }

    /// Characters per line that fit a 512px sticker at this font size.
    pub fn line_width(&self) -> usize {
        let glyph = (self.font_size as f32 * 0.55).max(1.0);
        ((472.0 / glyph) as usize).max(4)
    }
}

/// Whether `text` contains pictographic emoji.
pub fn has_emoji(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c as u32,
            0x1F300..=0x1FAFF | 0x2600..=0x27BF | 0x1F1E6..=0x1F1FF | 0x1F000..=0x1F2FF | 0xFE0F)
    })
}

/// Greedy word wrap on character count. Words longer than a line are split.
pub fn wrap_text(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let len = current.chars().count();
        if len > 0 && len + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}
