//! Pattern expansion for keyword brainstorming.
//!
//! A pattern is a keyword containing character classes, repeat counts or
//! escapes. It expands into the Cartesian product of its segments.
//!
//! # Pattern Syntax
//!
//! - `[abc]`, `[a-z0-9]`: one character from the class
//! - `[...]{n}`: `n` independent positions drawn from the class
//! - `\X`: literal `X`
//! - Any other character: literal
//!
//! # Examples
//!
//! ```
//! use tldx_lib::pattern::{expand_pattern, is_pattern_safe};
//!
//! let names = expand_pattern("[ab]{2}").unwrap();
//! assert_eq!(names, vec!["aa", "ab", "ba", "bb"]);
//!
//! let (safe, count) = is_pattern_safe("[a-z]{4}", 100_000).unwrap();
//! assert!(!safe);
//! assert_eq!(count, 456_976);
//! ```

use crate::error::DomainCheckError;

/// Longest repeat count accepted; no DNS label is longer.
pub const MAX_REPEAT: usize = 63;

/// One parsed unit of a pattern: `count` positions, each drawn from `chars`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub chars: Vec<char>,
    pub count: usize,
}

impl Segment {
    fn literal(ch: char) -> Self {
        Self {
            chars: vec![ch],
            count: 1,
        }
    }
}

/// True if the keyword uses pattern syntax.
pub fn is_pattern(s: &str) -> bool {
    s.contains(['[', '{', '\\'])
}

/// Parse a pattern into its segments.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, DomainCheckError> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut chars = pattern.chars().peekable();
    // Only a class may carry a repeat count.
    let mut last_was_class = false;

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let escaped = chars.next().ok_or_else(|| {
                    DomainCheckError::invalid_pattern(pattern, "dangling escape at end of pattern")
                })?;
                segments.push(Segment::literal(escaped));
                last_was_class = false;
            }
            '[' => {
                let class = parse_class(pattern, &mut chars)?;
                segments.push(Segment {
                    chars: class,
                    count: 1,
                });
                last_was_class = true;
            }
            '{' => {
                if !last_was_class {
                    return Err(DomainCheckError::invalid_pattern(
                        pattern,
                        "repetition without preceding character class",
                    ));
                }
                let count = parse_repeat(pattern, &mut chars)?;
                if let Some(last) = segments.last_mut() {
                    last.count = count;
                }
                last_was_class = false;
            }
            ']' | '}' => {
                return Err(DomainCheckError::invalid_pattern(
                    pattern,
                    format!("unbalanced '{}'", ch),
                ));
            }
            _ => {
                segments.push(Segment::literal(ch));
                last_was_class = false;
            }
        }
    }

    Ok(segments)
}

fn parse_class<I: Iterator<Item = char>>(
    pattern: &str,
    chars: &mut std::iter::Peekable<I>,
) -> Result<Vec<char>, DomainCheckError> {
    let mut members: Vec<char> = Vec::new();
    let push = |c: char, members: &mut Vec<char>| {
        if !members.contains(&c) {
            members.push(c);
        }
    };

    loop {
        let ch = chars
            .next()
            .ok_or_else(|| DomainCheckError::invalid_pattern(pattern, "unclosed '['"))?;
        let start = match ch {
            ']' => break,
            '\\' => chars
                .next()
                .ok_or_else(|| DomainCheckError::invalid_pattern(pattern, "unclosed '['"))?,
            '[' => {
                return Err(DomainCheckError::invalid_pattern(
                    pattern,
                    "nested '[' inside character class",
                ))
            }
            c => c,
        };

        // `a-b` is a range unless the dash is the last member of the class.
        if chars.peek() == Some(&'-') {
            chars.next();
            match chars.peek().copied() {
                Some(']') | None => {
                    push(start, &mut members);
                    push('-', &mut members);
                }
                Some(end) => {
                    chars.next();
                    if start > end {
                        return Err(DomainCheckError::invalid_pattern(
                            pattern,
                            format!("invalid range '{}-{}'", start, end),
                        ));
                    }
                    for c in start..=end {
                        push(c, &mut members);
                    }
                }
            }
        } else {
            push(start, &mut members);
        }
    }

    if members.is_empty() {
        return Err(DomainCheckError::invalid_pattern(
            pattern,
            "empty character class",
        ));
    }
    Ok(members)
}

fn parse_repeat<I: Iterator<Item = char>>(
    pattern: &str,
    chars: &mut I,
) -> Result<usize, DomainCheckError> {
    let mut digits = String::new();
    loop {
        match chars.next() {
            Some('}') => break,
            Some(c) => digits.push(c),
            None => return Err(DomainCheckError::invalid_pattern(pattern, "unclosed '{'")),
        }
    }
    let digits = digits.trim();
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        // All digits but unparseable means the count overflowed.
        let count = digits.parse::<usize>().unwrap_or(usize::MAX);
        if count > MAX_REPEAT {
            return Err(DomainCheckError::invalid_pattern(
                pattern,
                format!("repeat count {} exceeds {}", digits, MAX_REPEAT),
            ));
        }
        return Ok(count);
    }
    Err(DomainCheckError::invalid_pattern(
        pattern,
        format!("invalid repeat count '{}'", digits),
    ))
}

/// Project the number of strings a pattern expands to, without expanding it.
///
/// Returns `(false, running_product)` as soon as the product passes
/// `max_combinations`, so huge patterns never overflow.
pub fn is_pattern_safe(
    pattern: &str,
    max_combinations: u64,
) -> Result<(bool, u64), DomainCheckError> {
    let segments = parse_pattern(pattern)?;
    let mut total: u64 = 1;
    for segment in &segments {
        let size = segment.chars.len() as u64;
        if size == 1 {
            continue;
        }
        // With size >= 2 the ceiling is passed within 64 steps.
        for _ in 0..segment.count {
            total = total.saturating_mul(size);
            if total > max_combinations {
                return Ok((false, total));
            }
        }
    }
    Ok((true, total))
}

/// Expand a pattern into every string it matches, in lexicographic order
/// of the class definitions.
///
/// Odometer iteration: every position is a digit in a mixed-radix number,
/// rightmost first. A pattern with no segments yields a single empty string.
///
/// # Errors
///
/// `InvalidPattern` for syntax errors, and for patterns whose expansion
/// count does not fit in memory at all. Check [`is_pattern_safe`] first to
/// enforce a practical ceiling.
pub fn expand_pattern(pattern: &str) -> Result<Vec<String>, DomainCheckError> {
    let segments = parse_pattern(pattern)?;

    let positions: Vec<&[char]> = segments
        .iter()
        .flat_map(|s| std::iter::repeat(s.chars.as_slice()).take(s.count))
        .collect();

    let total = positions
        .iter()
        .try_fold(1usize, |acc, p| acc.checked_mul(p.len()))
        .ok_or_else(|| DomainCheckError::invalid_pattern(pattern, "pattern too large to expand"))?;
    let mut results = Vec::with_capacity(total.min(1_000_000));
    let mut counters = vec![0usize; positions.len()];

    for _ in 0..total {
        let name: String = counters
            .iter()
            .zip(&positions)
            .map(|(&c, options)| options[c])
            .collect();
        results.push(name);

        for i in (0..counters.len()).rev() {
            counters[i] += 1;
            if counters[i] < positions[i].len() {
                break;
            }
            counters[i] = 0;
        }
    }

    Ok(results)
}
