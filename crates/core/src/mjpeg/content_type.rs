use crate::error::{Result, StreamError};

/// Media type of an MJPEG-over-HTTP response.
pub const MIXED_REPLACE: &str = "multipart/x-mixed-replace";

/// Extract the multipart boundary from a `Content-Type` header value.
///
/// ```
/// use camstream::mjpeg::parse_boundary;
///
/// let boundary = parse_boundary("multipart/x-mixed-replace; boundary=frame").unwrap();
/// assert_eq!(boundary, "frame");
///
/// let quoted = parse_boundary("multipart/x-mixed-replace;boundary=\"my frame\"").unwrap();
/// assert_eq!(quoted, "my frame");
///
/// assert!(parse_boundary("image/jpeg").is_err());
/// ```
pub fn parse_boundary(content_type: &str) -> Result<String> {
    let mut params = content_type.split(';');

    let media_type = params.next().unwrap_or("").trim().to_ascii_lowercase();
    if media_type != MIXED_REPLACE {
        return Err(StreamError::UnexpectedContentType(media_type));
    }

    let boundary = params
        .map(str::trim)
        .find_map(|param| param.strip_prefix("boundary="))
        .ok_or(StreamError::MissingBoundary)?;

    let boundary = match boundary
        .strip_prefix('"')
        .and_then(|b| b.strip_suffix('"'))
    {
        Some(quoted) => quoted.replacen('\\', "", 1),
        None => boundary.to_string(),
    };

    Ok(boundary)
}
