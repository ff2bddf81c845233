use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use std::collections::HashMap;
use ttf_parser::Face;

/// Advance used for glyphs the face lacks, and when no face resolves at all.
const FALLBACK_EM: f32 = 0.56;
const ELLIPSIS: char = '\u{2026}';

/// Label measurement for node cards.
///
/// Faces are looked up through fontdb and cached per family string. Without a
/// usable face every character counts as [`FALLBACK_EM`] of the font size.
pub struct TextMeasurer {
    db: Database,
    system_fonts: bool,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FontFace>>,
}

impl Default for TextMeasurer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasurer {
    /// Measures with system fonts, loaded on first use.
    pub fn new() -> Self {
        Self {
            db: Database::new(),
            system_fonts: true,
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    /// Never touches the system font set; all widths use the fallback advance.
    pub fn fallback_only() -> Self {
        Self {
            system_fonts: false,
            ..Self::new()
        }
    }

    pub fn width(&mut self, text: &str, font_size: f32, font_family: &str) -> f32 {
        if text.is_empty() || font_size <= 0.0 {
            return 0.0;
        }
        let key = normalize_family_key(font_family);
        if !self.faces.contains_key(&key) {
            let face = self.load_face(&key);
            if face.is_none() {
                tracing::debug!(family = %key, "no font face resolved, using fallback widths");
            }
            self.faces.insert(key.clone(), face);
        }
        match self.faces.get(&key).and_then(Option::as_ref) {
            Some(face) => face.measure(text, font_size),
            None => text.chars().count() as f32 * font_size * FALLBACK_EM,
        }
    }

    /// Shortens `text` with a trailing ellipsis until it fits `max_width`.
    pub fn ellipsize(
        &mut self,
        text: &str,
        max_width: f32,
        font_size: f32,
        font_family: &str,
    ) -> String {
        if self.width(text, font_size, font_family) <= max_width {
            return text.to_string();
        }
        let mut chars: Vec<char> = text.chars().collect();
        while !chars.is_empty() {
            chars.pop();
            let mut candidate: String = chars.iter().collect::<String>().trim_end().to_string();
            candidate.push(ELLIPSIS);
            if self.width(&candidate, font_size, font_family) <= max_width {
                return candidate;
            }
        }
        ELLIPSIS.to_string()
    }

    fn load_face(&mut self, family_key: &str) -> Option<FontFace> {
        if !self.system_fonts {
            return None;
        }
        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let names: Vec<&str> = family_key
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Family::SansSerif
                }
                _ => Family::Name(name),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontFace::parse(data, index))
            .flatten()
    }
}

/// Advances resolved once per face, in font units.
struct FontFace {
    units_per_em: f32,
    ascii: [u16; 128],
    others: HashMap<char, u16>,
}

impl FontFace {
    fn parse(data: &[u8], index: u32) -> Option<Self> {
        let face = Face::parse(data, index).ok()?;
        let advance = |ch: char| {
            face.glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .unwrap_or(0)
        };
        let mut ascii = [0u16; 128];
        for byte in 0u8..=127 {
            ascii[byte as usize] = advance(byte as char);
        }
        // Latin-1 supplement and general punctuation cover most labels.
        let others = ('\u{A0}'..='\u{17F}')
            .chain('\u{2010}'..='\u{2027}')
            .map(|ch| (ch, advance(ch)))
            .filter(|(_, adv)| *adv > 0)
            .collect();
        Some(Self {
            units_per_em: f32::from(face.units_per_em().max(1)),
            ascii,
            others,
        })
    }

    fn measure(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em;
        let fallback = font_size * FALLBACK_EM;
        text.chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| {
                let advance = if ch.is_ascii() {
                    self.ascii[ch as usize]
                } else {
                    self.others.get(&ch).copied().unwrap_or(0)
                };
                if advance == 0 {
                    fallback
                } else {
                    f32::from(advance) * scale
                }
            })
            .sum()
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}
