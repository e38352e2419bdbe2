//! Detail page parsing
//!
//! A detail page is first reduced to a [`DetailPage`]: the keyed metadata
//! sections plus the handful of elements the record needs. Field derivation
//! then works on that structure only, so a change in the site's markup is
//! fixed in [`DetailPage::parse`] and a change in a field's text format is
//! fixed in the matching derivation function.

use crate::catalog::ItemRecord;
use crate::crawler::consts;
use crate::{ExtractionError, ExtractionErrorKind};
use chrono::{DateTime, Duration, Months, NaiveTime, Utc};
use scraper::{ElementRef, Html};
use std::collections::HashMap;

type FieldResult<T> = std::result::Result<T, ExtractionErrorKind>;

/// Section names as they appear on the page (lower-cased)
pub mod section {
    pub const AUTHOR: &str = "author";
    pub const CATEGORY: &str = "category";
    pub const CONTENT: &str = "content";
    pub const PAGE: &str = "page";
    pub const VIEW: &str = "view";
    pub const RELEASE_YEAR: &str = "release year";
}

/// Placeholder the site shows for an unknown release year
const UNKNOWN_YEAR: &str = "-";

/// The parts of a detail page that records are built from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailPage {
    /// Lower-cased section name → lower-cased display values, in page order
    pub sections: HashMap<String, Vec<String>>,

    /// Lower-cased upload annotation of every chapter entry that has one
    pub upload_notes: Vec<String>,

    /// Raw `data-mid` attribute of the bookmark button
    pub bookmark_id: Option<String>,

    /// Text of the caption next to the rating widget
    pub rating: Option<String>,

    /// Raw `data-src` attribute of the cover image
    pub cover_src: Option<String>,
}

impl DetailPage {
    /// Reduces detail page markup to its structured parts
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);

        let mut sections = HashMap::new();
        for info in document.select(&consts::SECTION_SELECTOR) {
            let name = info
                .select(&consts::SECTION_NAME_SELECTOR)
                .map(|b| normalized_text(&b))
                .collect::<String>();
            let name = name.trim_end_matches(':').trim();
            if name.is_empty() {
                continue;
            }

            let values = info
                .select(&consts::SECTION_VALUE_SELECTOR)
                .map(|a| normalized_text(&a))
                .filter(|value| !value.is_empty())
                .collect();
            sections.insert(name.to_string(), values);
        }

        let upload_notes = document
            .select(&consts::CHAPTER_SELECTOR)
            .map(|chapter| {
                chapter
                    .select(&consts::MUTED_SELECTOR)
                    .map(|muted| normalized_text(&muted))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|note| !note.is_empty())
            .collect();

        let bookmark_id = document
            .select(&consts::BOOKMARK_SELECTOR)
            .find_map(|button| button.value().attr("data-mid"))
            .map(|mid| mid.trim().to_string());

        let rating = document
            .select(&consts::RATING_SELECTOR)
            .next()
            .and_then(first_sibling)
            .map(|caption| normalized_text(&caption));

        let cover_src = document
            .select(&consts::COVER_SELECTOR)
            .find_map(|img| img.value().attr("data-src"))
            .map(str::to_string);

        Self {
            sections,
            upload_notes,
            bookmark_id,
            rating,
            cover_src,
        }
    }

    /// Values of a section, if the page has it
    pub fn section(&self, name: &str) -> Option<&[String]> {
        self.sections.get(name).map(Vec::as_slice)
    }

    fn first_value(&self, name: &'static str) -> FieldResult<&str> {
        self.section(name)
            .and_then(|values| values.first())
            .map(String::as_str)
            .ok_or(ExtractionErrorKind::MissingSection(name))
    }

    fn values(&self, name: &'static str) -> FieldResult<Vec<String>> {
        let values = self
            .section(name)
            .ok_or(ExtractionErrorKind::MissingSection(name))?;
        if values.is_empty() {
            return Err(ExtractionErrorKind::EmptySection(name));
        }
        Ok(values.to_vec())
    }
}

/// Everything a record needs, validated, except what the cover cache decides
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDetail {
    pub id: u64,
    pub views: u64,
    pub pages: u32,
    pub chapters: u32,
    pub year: Option<i32>,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub score: f64,
    pub votes: u64,
    pub uploaded: Option<DateTime<Utc>>,
    /// Raw cover attribute, only resolved when the cover must be downloaded
    pub cover_src: Option<String>,
}

impl ParsedDetail {
    /// Absolute URL of the cover image
    pub fn cover_url(&self) -> FieldResult<&str> {
        let src = self
            .cover_src
            .as_deref()
            .ok_or(ExtractionErrorKind::MissingElement("cover image"))?;
        consts::COVER_URL_REGEX
            .captures(src)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| ExtractionErrorKind::Unparseable {
                field: "cover url",
                value: src.to_string(),
            })
    }

    pub fn into_record(self, name: &str, cover: bool) -> ItemRecord {
        ItemRecord {
            id: self.id,
            name: name.to_string(),
            cover,
            views: self.views,
            pages: self.pages,
            chapters: self.chapters,
            year: self.year,
            authors: self.authors,
            categories: self.categories,
            tags: self.tags,
            score: self.score,
            votes: self.votes,
            uploaded: self.uploaded,
            label: None,
        }
    }
}

/// Parses and validates every field of a detail page
///
/// `now` anchors the relative upload times. Fails on the first field that is
/// missing or malformed; no partial result is ever returned.
pub fn parse_detail(html: &str, url: &str, now: DateTime<Utc>) -> Result<ParsedDetail, ExtractionError> {
    let page = DetailPage::parse(html);
    derive_fields(&page, now).map_err(|kind| ExtractionError::new(url, kind))
}

fn derive_fields(page: &DetailPage, now: DateTime<Utc>) -> FieldResult<ParsedDetail> {
    let (score, votes) = rating(page)?;
    Ok(ParsedDetail {
        id: id(page)?,
        views: views(page)?,
        pages: pages(page)?,
        chapters: chapters(page)?,
        year: year(page)?,
        authors: page.values(section::AUTHOR)?,
        categories: page.values(section::CATEGORY)?,
        tags: page.values(section::CONTENT)?,
        score,
        votes,
        uploaded: uploaded(page, now)?,
        cover_src: page.cover_src.clone(),
    })
}

pub(crate) fn id(page: &DetailPage) -> FieldResult<u64> {
    let mid = page
        .bookmark_id
        .as_deref()
        .filter(|mid| !mid.is_empty())
        .ok_or(ExtractionErrorKind::MissingElement("bookmark id"))?;
    let id = mid.parse().map_err(|_| ExtractionErrorKind::Unparseable {
        field: "bookmark id",
        value: mid.to_string(),
    })?;
    storable(id, "bookmark id")
}

pub(crate) fn views(page: &DetailPage) -> FieldResult<u64> {
    let value = page.first_value(section::VIEW)?;
    storable(capture_number(&consts::VIEWS_REGEX, value, "views")?, "views")
}

pub(crate) fn pages(page: &DetailPage) -> FieldResult<u32> {
    let value = page.first_value(section::PAGE)?;
    capture_number(&consts::PAGES_REGEX, value, "pages")
}

/// Chapter count from the page section; single-chapter items omit it
pub(crate) fn chapters(page: &DetailPage) -> FieldResult<u32> {
    let value = page.first_value(section::PAGE)?;
    if !consts::CHAPTERS_REGEX.is_match(value) {
        return Ok(1);
    }
    capture_number(&consts::CHAPTERS_REGEX, value, "chapters")
}

pub(crate) fn year(page: &DetailPage) -> FieldResult<Option<i32>> {
    let value = page.first_value(section::RELEASE_YEAR)?;
    if value == UNKNOWN_YEAR {
        return Ok(None);
    }
    capture_number(&consts::YEAR_REGEX, value, "year").map(Some)
}

pub(crate) fn rating(page: &DetailPage) -> FieldResult<(f64, u64)> {
    let text = page
        .rating
        .as_deref()
        .ok_or(ExtractionErrorKind::MissingElement("rating"))?;
    let unparseable = || ExtractionErrorKind::Unparseable {
        field: "rating",
        value: text.to_string(),
    };

    let captures = consts::RATING_REGEX.captures(text).ok_or_else(unparseable)?;
    let score: f64 = captures[1].parse().map_err(|_| unparseable())?;
    let votes: u64 = captures[2].parse().map_err(|_| unparseable())?;

    if !(0.0..=5.0).contains(&score) {
        return Err(ExtractionErrorKind::OutOfRange {
            field: "score",
            value: captures[1].to_string(),
        });
    }

    Ok((score, storable(votes, "votes")?))
}

/// Earliest upload time across the chapter list
pub(crate) fn uploaded(page: &DetailPage, now: DateTime<Utc>) -> FieldResult<Option<DateTime<Utc>>> {
    let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();

    let mut earliest: Option<DateTime<Utc>> = None;
    for note in &page.upload_notes {
        let unparseable = || ExtractionErrorKind::Unparseable {
            field: "uploaded",
            value: note.clone(),
        };

        let captures = consts::UPLOADED_REGEX.captures(note).ok_or_else(unparseable)?;
        let amount: u32 = captures[1].parse().map_err(|_| unparseable())?;
        let at = subtract_units(today, amount, &captures[2]).ok_or_else(unparseable)?;

        earliest = Some(earliest.map_or(at, |e| e.min(at)));
    }

    Ok(earliest)
}

/// `from` minus `amount` of a calendar unit given as an English word
fn subtract_units(from: DateTime<Utc>, amount: u32, unit: &str) -> Option<DateTime<Utc>> {
    let unit = unit.strip_suffix('s').unwrap_or(unit);
    let amount_i64 = i64::from(amount);
    let delta = match unit {
        "second" => Duration::try_seconds(amount_i64)?,
        "minute" => Duration::try_minutes(amount_i64)?,
        "hour" => Duration::try_hours(amount_i64)?,
        "day" => Duration::try_days(amount_i64)?,
        "week" => Duration::try_weeks(amount_i64)?,
        "month" => return from.checked_sub_months(Months::new(amount)),
        "year" => return from.checked_sub_months(Months::new(amount.checked_mul(12)?)),
        _ => return None,
    };
    from.checked_sub_signed(delta)
}

/// Counters are stored as SQLite integers, which are signed
fn storable(value: u64, field: &'static str) -> FieldResult<u64> {
    if i64::try_from(value).is_err() {
        return Err(ExtractionErrorKind::OutOfRange {
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// First capture group of `regex` in `value`, separators stripped, as a number
fn capture_number<T: std::str::FromStr>(
    regex: &regex::Regex,
    value: &str,
    field: &'static str,
) -> FieldResult<T> {
    let unparseable = || ExtractionErrorKind::Unparseable {
        field,
        value: value.to_string(),
    };

    let digits = regex
        .captures(value)
        .and_then(|captures| captures.get(1))
        .ok_or_else(unparseable)?
        .as_str()
        .replace(',', "");
    digits.parse().map_err(|_| unparseable())
}

fn normalized_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_lowercase()
}

/// First element sibling of `element` in document order, skipping itself
fn first_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let parent = element.parent()?;
    parent
        .children()
        .filter(|node| node.id() != element.id())
        .find_map(ElementRef::wrap)
}
