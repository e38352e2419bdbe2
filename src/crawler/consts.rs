use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).expect("static selector is valid"));
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($regex).expect("static regex is valid"));
    };
}

// Listing pages
selector!(PAGINATION_SELECTOR, ".pagination li");
selector!(ITEM_LINK_SELECTOR, ".overlay-button .btn:nth-child(2)");

// Detail pages: metadata sections
selector!(SECTION_SELECTOR, ".list.list-simple-mini .text-primary");
selector!(SECTION_NAME_SELECTOR, "b");
selector!(SECTION_VALUE_SELECTOR, "a");

// Detail pages: everything else
selector!(CHAPTER_SELECTOR, ".nav-chapters li");
selector!(MUTED_SELECTOR, ".text-muted");
selector!(BOOKMARK_SELECTOR, ".js-addBookmark");
selector!(RATING_SELECTOR, ".js-raty");
selector!(COVER_SELECTOR, "img.img-responsive");

regex!(VIEWS_REGEX, r"^([\d,]+) views");
regex!(PAGES_REGEX, r"^([\d,]+) pages");
regex!(CHAPTERS_REGEX, r"([\d,]+) chapters$");
regex!(YEAR_REGEX, r"^(\d+)");
regex!(RATING_REGEX, r"score ([\d.]+)/5 with (\d+) votes");
regex!(UPLOADED_REGEX, r"uploaded\b.*\babout (\d+)\s*([a-z]+) ago");
regex!(COVER_URL_REGEX, r"(https?://.+)");
