/// Header of a single multipart entity.
///
/// Field names are stored lower-cased, so lookups via [`get`](Self::get)
/// are case-insensitive. A repeated field replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityHeader {
    fields: Vec<(String, String)>,
}

impl EntityHeader {
    /// Decode a header block (the bytes between the boundary line and the
    /// empty line, without the final CRLF).
    ///
    /// Lines are folded RFC 2822-style: a line starting with a non-whitespace
    /// character begins a new field, any other line is appended verbatim to
    /// the field before it. The field name is the text before the first
    /// colon; the value is everything after it, minus the whitespace that
    /// follows the colon. Trailing whitespace is kept.
    pub fn parse(text: &str) -> Self {
        let mut header = EntityHeader::default();
        let mut field = String::new();

        for line in text.split("\r\n") {
            let starts_field = line.chars().next().is_some_and(|c| !c.is_whitespace());
            if starts_field {
                header.commit(&mut field);
            }
            field.push_str(line);
        }

        header.commit(&mut field);
        header
    }

    fn commit(&mut self, field: &mut String) {
        if field.is_empty() {
            return;
        }

        let (name, value) = match field.split_once(':') {
            Some((name, value)) => (name, value),
            None => (field.as_str(), ""),
        };

        self.insert(name.trim(), value.trim_start());
        field.clear();
    }

    fn insert(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.fields.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.fields.push((name, value.to_string())),
        }
    }

    /// Look up a field value by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }

    /// Declared body size. `None` when the field is missing or is not a
    /// non-negative decimal integer; such entities carry no frame.
    pub fn content_length(&self) -> Option<usize> {
        self.get("content-length")?.trim_end().parse().ok()
    }

    /// Iterate over `(name, value)` pairs in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_header() {
        let header = EntityHeader::parse("Content-Type: image/jpeg\r\nContent-Length: 1234");
        assert_eq!(header.content_type(), Some("image/jpeg"));
        assert_eq!(header.content_length(), Some(1234));
        assert_eq!(header.len(), 2);
    }

    #[test]
    fn names_are_lower_cased() {
        let header = EntityHeader::parse("CONTENT-TYPE: image/jpeg");
        let names: Vec<_> = header.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["content-type"]);
        assert_eq!(header.get("Content-Type"), Some("image/jpeg"));
    }

    #[test]
    fn folded_line_is_concatenated() {
        let header = EntityHeader::parse("Content-Type: image/\r\n jpeg\r\nContent-Length: 3");
        assert_eq!(header.content_type(), Some("image/ jpeg"));
        assert_eq!(header.content_length(), Some(3));
    }

    #[test]
    fn value_keeps_internal_colons() {
        let header = EntityHeader::parse("X-Timestamp: 12:30:45");
        assert_eq!(header.get("x-timestamp"), Some("12:30:45"));
    }

    #[test]
    fn trailing_whitespace_is_kept() {
        let header = EntityHeader::parse("X-Camera:  front door \r\nContent-Length: 12 ");
        assert_eq!(header.get("x-camera"), Some("front door "));
        assert_eq!(header.get("content-length"), Some("12 "));
        assert_eq!(header.content_length(), Some(12));
    }

    #[test]
    fn later_field_replaces_earlier() {
        let header = EntityHeader::parse("Content-Length: 1\r\nContent-Length: 2");
        assert_eq!(header.content_length(), Some(2));
        assert_eq!(header.len(), 1);
    }

    #[test]
    fn invalid_content_length() {
        for raw in [
            "Content-Type: image/jpeg",
            "Content-Length:",
            "Content-Length: abc",
            "Content-Length: -5",
            "Content-Length: 4.5",
        ] {
            assert_eq!(EntityHeader::parse(raw).content_length(), None, "{raw}");
        }
    }

    #[test]
    fn empty_block() {
        assert!(EntityHeader::parse("").is_empty());
    }
}
