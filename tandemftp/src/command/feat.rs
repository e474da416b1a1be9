use crate::types::Features;

/// Parses the body of a FEAT reply into the feature set.
///
/// RFC is specified [RFC 2389](https://datatracker.ietf.org/doc/html/rfc2389#section-3.2).
///
/// ```text
/// 211-Extensions supported:
///  MLST size*;create;modify*;perm;media-type
///  SIZE
///  UTF8
/// 211 END
/// ```
///
/// Only the lines starting with a space carry a feature; the first and the last line,
/// and anything else a server may put in between, are ignored.
/// A feature line is `feature-label [SP parameters]`; the label is kept as sent.
pub fn parse_features(lines: &[String]) -> Features {
    let mut features = Features::with_capacity(lines.len());
    for line in lines.iter().filter(|line| line.starts_with(' ')) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (name, params) = match line.split_once(' ') {
            Some((name, params)) => (name, Some(params.trim().to_string())),
            None => (line, None),
        };
        debug!("found supported feature: {name}: {params:?}");
        features.insert(name.to_string(), params);
    }

    features
}
