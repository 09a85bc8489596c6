//! INI tweak rendering and merging.
//!
//! Merging edits an existing file line by line: only the lines of touched
//! keys change, new keys go after the last line of their section, new
//! sections go at the end. Everything else, comments included, is kept byte
//! for byte. Files that are not valid UTF-8 are handled as Latin-1 so that
//! their bytes survive the round trip.

use crate::state::IniSetting;

/// Comment placed at the top of every generated section block.
pub const SECTION_HEADER: &str = "; Generated by the BAIN wizard installer";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text of a fresh tweak file holding only `settings`.
///
/// Settings are grouped per section in first-seen order; a key set twice
/// keeps its first position and its last value.
pub fn render_tweaks(settings: &[IniSetting]) -> String {
    let mut sections: Vec<(&str, Vec<&IniSetting>)> = Vec::new();
    for setting in settings {
        let index = match sections
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(&setting.section))
        {
            Some(index) => index,
            None => {
                sections.push((setting.section.as_str(), Vec::new()));
                sections.len() - 1
            }
        };
        let keys = &mut sections[index].1;
        match keys
            .iter()
            .position(|s| s.key.eq_ignore_ascii_case(&setting.key))
        {
            Some(existing) => keys[existing] = setting,
            None => keys.push(setting),
        }
    }

    let mut out = String::new();
    for (i, (section, keys)) in sections.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("[{}]\n{}\n", section, SECTION_HEADER));
        for setting in keys {
            if let Some(previous) = &setting.previous {
                out.push_str(&format!("; original value: {}\n", previous));
            }
            out.push_str(&format!("{}={}\n", setting.key, setting.value));
        }
    }
    out
}

/// Apply `settings` to the bytes of an existing INI file.
pub fn merge_tweaks(original: &[u8], settings: &[IniSetting]) -> Vec<u8> {
    // A UTF-8 byte order mark is not part of the first line
    let (bom, original) = match original.strip_prefix(UTF8_BOM) {
        Some(rest) => (UTF8_BOM, rest),
        None => (&[][..], original),
    };
    let (text, latin1) = match std::str::from_utf8(original) {
        Ok(text) => (text.to_string(), false),
        Err(_) => (original.iter().map(|&b| b as char).collect(), true),
    };

    let mut doc = IniDocument::parse(&text);
    for setting in settings {
        doc.apply(setting);
    }
    let merged = doc.into_string();

    let mut out = bom.to_vec();
    if latin1 {
        out.extend(
            merged
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')),
        );
    } else {
        out.extend(merged.into_bytes());
    }
    out
}

struct IniDocument {
    lines: Vec<String>,
    eol: &'static str,
}

impl IniDocument {
    fn parse(text: &str) -> Self {
        let eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
        Self {
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
            eol,
        }
    }

    fn into_string(self) -> String {
        self.lines.concat()
    }

    fn apply(&mut self, setting: &IniSetting) {
        let Some(header) = self.find_section(&setting.section) else {
            self.append_section(setting);
            return;
        };
        let end = self.section_end(header);

        for index in header + 1..end {
            let Some(key) = key_of(&self.lines[index]) else {
                continue;
            };
            if key.eq_ignore_ascii_case(&setting.key) {
                let key = key.to_string();
                let eol = line_ending(&self.lines[index]);
                self.lines[index] = format!("{}={}{}", key, setting.value, eol);
                return;
            }
        }

        let last = (header..end)
            .rev()
            .find(|&index| !self.lines[index].trim().is_empty())
            .unwrap_or(header);
        self.terminate_line(last);
        self.lines
            .insert(last + 1, format!("{}={}{}", setting.key, setting.value, self.eol));
    }

    fn append_section(&mut self, setting: &IniSetting) {
        if let Some(last) = self.lines.len().checked_sub(1) {
            self.terminate_line(last);
            if !self.lines[last].trim().is_empty() {
                self.lines.push(self.eol.to_string());
            }
        }
        self.lines.push(format!("[{}]{}", setting.section, self.eol));
        self.lines
            .push(format!("{}={}{}", setting.key, setting.value, self.eol));
    }

    fn terminate_line(&mut self, index: usize) {
        if !self.lines[index].ends_with('\n') {
            self.lines[index].push_str(self.eol);
        }
    }

    fn find_section(&self, name: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| section_of(line).is_some_and(|s| s.eq_ignore_ascii_case(name.trim())))
    }

    fn section_end(&self, header: usize) -> usize {
        self.lines
            .iter()
            .enumerate()
            .skip(header + 1)
            .find(|(_, line)| section_of(line).is_some())
            .map(|(index, _)| index)
            .unwrap_or(self.lines.len())
    }
}

fn section_of(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('[')?;
    let end = inner.find(']')?;
    Some(inner[..end].trim())
}

fn key_of(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with(';') || trimmed.starts_with('#') {
        return None;
    }
    let (key, _) = trimmed.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then_some(key)
}

fn line_ending(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}
