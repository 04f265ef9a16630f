//! Static pattern tables shared by both heuristics.
//!
//! Domain tables are case-insensitive regex sets compiled once on first use.
//! Keyword tables are matched as substrings of lowercased page text; each
//! entry counts at most once.

use once_cell::sync::Lazy;
use regex::RegexSet;

pub const NEWS_KEYWORDS: &[&str] = &[
    "news", "article", "report", "breaking", "headlines", "journalism",
    "according to", "sources say", "officials said", "police said",
    "government", "authorities", "investigation", "arrest", "raid",
    "shut down", "closed", "banned", "warning", "alert", "crackdown",
    "published", "reporter", "correspondent", "editor", "byline",
];

/// Indicators that a page is reporting on piracy rather than hosting it.
pub const PIRACY_NEWS_KEYWORDS: &[&str] = &[
    "news", "article", "report", "according to", "sources say",
    "officials said", "police said", "government", "authorities",
    "investigation", "arrest", "raid", "shut down", "closed", "banned",
];

pub const ADULT_KEYWORDS: &[&str] = &[
    "porn", "xxx", "adult", "sex", "nude", "naked", "erotic", "fetish",
    "bdsm", "cam", "webcam", "escort", "dating", "hookup", "milf", "teen",
    "anal", "oral", "blowjob", "fuck", "pussy", "dick", "cock", "tits",
    "boobs", "ass", "butt", "pornography", "sexual", "intimate", "horny",
    "sexy", "hot", "strip", "stripclub", "brothel", "prostitute", "hooker",
    "massage", "parlour", "adult video", "adult film", "porn video",
    "sex video", "nude video", "adult content", "adult entertainment",
    "adult site", "porn site", "sex site", "adult chat", "sex chat",
    "adult dating", "sex dating", "adult friend", "sex friend",
];

pub const PIRACY_KEYWORDS: &[&str] = &[
    "torrent", "download", "free movie", "free tv show", "streaming",
    "watch online", "hd quality", "bluray", "dvdrip", "camrip", "hdcam",
    "free download", "movie download", "tv show download", "series download",
    "film download", "pirate", "piracy", "illegal", "unauthorized",
    "copyright infringement", "dmca", "cease and desist",
];

pub const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "phishing", "scam", "fraud", "malware", "virus", "hack", "steal",
    "password", "credit card", "bitcoin", "crypto", "investment",
    "free money", "click here", "urgent", "act now", "lottery", "winner",
    "congratulations", "you won", "claim now", "limited time", "exclusive offer",
    "verify account", "suspended", "expired", "update now", "click to continue",
];

pub const LEGITIMATE_KEYWORDS: &[&str] = &[
    "about us", "contact", "privacy policy", "terms of service", "news",
    "article", "blog", "support", "help", "home", "services", "products",
    "company", "business", "official", "copyright", "all rights reserved",
    "customer service", "faq", "help center", "contact us", "about",
    "mission", "vision", "team", "careers", "jobs", "press", "media",
];

pub const LINK_SHORTENERS: &[&str] = &["bit.ly", "tinyurl.com", "t.co"];

const WELL_KNOWN_DOMAINS: &[&str] = &[
    "google", "wikipedia", "github", "stackoverflow", "reddit",
    "youtube", "amazon", "microsoft", "apple", "yahoo", "bing",
    "netflix", "spotify", "linkedin", "twitter", "facebook", "instagram",
    "news18", "hindustantimes", "zeenews", "indianexpress", "thehindu",
    "ndtv", "republicworld", "aajtak", "abpnews", "cnn", "bbc",
    "reuters", "bloomberg", "wsj", "nytimes", "washingtonpost",
    "guardian", "telegraph", "independent", "dailymail", "mirror",
    "edu", "gov", "mil", "org", "university", "college", "school",
    "research", "academic", "institute", "foundation", "museum",
    "roboflow", "sketchfab", "academia", "scholar", "arxiv",
];

const NEWS_DOMAINS: &[&str] = &[
    "news", "times", "post", "herald", "tribune", "gazette",
    "chronicle", "journal", "press", "media", "tv", "channel",
];

const ADULT_DOMAINS: &[&str] = &[
    "porn", "xxx", "adult", "sex", "nude", "naked", "erotic",
    "fetish", "bdsm", "cam", "webcam", "escort", "dating",
    "hookup", "milf", "teen", "anal", "oral", "blowjob",
    "fuck", "pussy", "dick", "cock", "tits", "boobs", "ass",
    "butt", "pornography", "sexual", "intimate", "horny", "sexy",
    "hot", "strip", "stripclub", "brothel", "prostitute", "hooker",
    "massage", "parlour", "adultvideo", "adultfilm", "pornvideo",
    "sexvideo", "nudevideo", "adultcontent", "adultentertainment",
    "adultsite", "pornsite", "sexsite", "adultchat", "sexchat",
    "adultdating", "sexdating", "adultfriend", "sexfriend",
];

const PIRACY_DOMAINS: &[&str] = &[
    "torrent", "pirate", "free", "download", "stream", "watch",
    "movie", "film", "tv", "series", "episode",
];

/// Piracy sites that usually refuse or block fetches.
const BLOCKED_PIRACY_DOMAINS: &[&str] = &[
    "bappam", "ibomma", "movierulz", "tamilrockers", "filmywap",
    "filmyzilla", "bollyflix", "moviesflix", "worldfree4u", "khatrimaza",
    "pagalworld", "mp4moviez", "filmyhit", "skymovieshd", "moviescounter",
    "extramovies", "9xmovies", "coolmoviez", "moviezwap", "filmy4wap",
    "hdmoviesflix", "moviesflixpro", "filmygod", "moviesflixhd", "tamilyogi",
    "isaimini", "tamilgun", "moviesda", "tamilmv", "thepiratebay",
    "1337x", "rarbg", "yts", "eztv",
];

pub static WELL_KNOWN_DOMAIN_SET: Lazy<RegexSet> = Lazy::new(|| fragment_set(WELL_KNOWN_DOMAINS));
pub static NEWS_DOMAIN_SET: Lazy<RegexSet> = Lazy::new(|| fragment_set(NEWS_DOMAINS));
pub static ADULT_DOMAIN_SET: Lazy<RegexSet> = Lazy::new(|| fragment_set(ADULT_DOMAINS));
pub static PIRACY_DOMAIN_SET: Lazy<RegexSet> = Lazy::new(|| fragment_set(PIRACY_DOMAINS));
pub static BLOCKED_PIRACY_DOMAIN_SET: Lazy<RegexSet> =
    Lazy::new(|| fragment_set(BLOCKED_PIRACY_DOMAINS));

/// Host shapes that look like an ordinary registered name.
pub static STANDARD_DOMAIN_SET: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)^[a-z]+\.(com|org|net|edu|gov|mil)$",
        r"(?i)^[a-z]+\.(co\.uk|com\.au|co\.in|co\.jp)$",
        r"(?i)^[a-z]+\.[a-z]+\.[a-z]+$",
    ])
    .expect("valid standard domain patterns")
});

/// IPv4 literal, odd characters, a 1-3 char first label, or a free TLD.
pub static SUSPICIOUS_DOMAIN_SET: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"^\d+\.\d+\.\d+\.\d+$",
        r"(?i)[^a-z0-9.-]",
        r"^.{1,3}\.",
        r"(?i)\.(tk|ml|ga|cf)$",
    ])
    .expect("valid suspicious domain patterns")
});

fn fragment_set(fragments: &[&str]) -> RegexSet {
    RegexSet::new(
        fragments
            .iter()
            .map(|fragment| format!("(?i){}", regex::escape(fragment))),
    )
    .expect("valid domain fragment patterns")
}

/// Number of distinct table entries present in `haystack` (already lowercased).
pub fn keyword_hits(haystack: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|keyword| haystack.contains(**keyword))
        .count()
}
