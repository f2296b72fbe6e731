//! Browser identity rotation
//!
//! Retailers block obvious automation, so every request goes out with a
//! browser identity drawn from a static pool. Selection is random per call
//! and never influences what gets extracted from a page.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT,
};

/// Browser profile with realistic request headers
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub accept: &'static str,
    pub accept_language: &'static str,
    pub accept_encoding: &'static str,
    pub sec_ch_ua: Option<String>,
    pub sec_ch_ua_platform: Option<&'static str>,
}

/// Chrome majors seen in the wild; full version is `<major>.0.0.0`.
const CHROME_MAJORS: &[&str] = &["131", "130", "129", "128", "127", "120"];

const FIREFOX_VERSIONS: &[&str] = &["133.0", "132.0", "131.0", "128.0"];

/// Safari (version, `WebKit` build)
const SAFARI_VERSIONS: &[(&str, &str)] = &[
    ("18.2", "605.1.15"),
    ("18.1", "605.1.15"),
    ("17.6", "605.1.15"),
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "en-US,en;q=0.9,es;q=0.8",
    "en-US,en;q=0.9,fr;q=0.8",
    "en-CA,en;q=0.9",
];

#[derive(Debug, Clone, Copy)]
enum Platform {
    MacOS,
    Windows,
    Linux,
}

impl Platform {
    fn random() -> Self {
        // Realistic distribution: Windows 65%, macOS 20%, Linux 15%
        let roll: f32 = rand::thread_rng().gen();
        if roll < 0.65 {
            Platform::Windows
        } else if roll < 0.85 {
            Platform::MacOS
        } else {
            Platform::Linux
        }
    }

    fn os_string(self) -> &'static str {
        match self {
            Platform::MacOS => "Macintosh; Intel Mac OS X 10_15_7",
            Platform::Windows => "Windows NT 10.0; Win64; x64",
            Platform::Linux => "X11; Linux x86_64",
        }
    }

    fn sec_ch_platform(self) -> &'static str {
        match self {
            Platform::MacOS => "\"macOS\"",
            Platform::Windows => "\"Windows\"",
            Platform::Linux => "\"Linux\"",
        }
    }
}

fn pick<T>(items: &'static [T]) -> &'static T {
    // Pools are non-empty constants.
    &items[rand::thread_rng().gen_range(0..items.len())]
}

fn random_accept_language() -> &'static str {
    ACCEPT_LANGUAGES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("en-US,en;q=0.9")
}

/// Generate a Chrome profile
#[must_use]
pub fn chrome_profile() -> BrowserProfile {
    let platform = Platform::random();
    let major = pick(CHROME_MAJORS);

    BrowserProfile {
        user_agent: format!(
            "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{major}.0.0.0 Safari/537.36",
            platform.os_string()
        ),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        accept_language: random_accept_language(),
        accept_encoding: "gzip, deflate, br, zstd",
        sec_ch_ua: Some(format!(
            "\"Google Chrome\";v=\"{major}\", \"Chromium\";v=\"{major}\", \"Not_A Brand\";v=\"24\""
        )),
        sec_ch_ua_platform: Some(platform.sec_ch_platform()),
    }
}

/// Generate a Firefox profile
#[must_use]
pub fn firefox_profile() -> BrowserProfile {
    let platform = Platform::random();
    let version = pick(FIREFOX_VERSIONS);

    BrowserProfile {
        user_agent: format!(
            "Mozilla/5.0 ({}; rv:{version}) Gecko/20100101 Firefox/{version}",
            platform.os_string()
        ),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        accept_language: random_accept_language(),
        accept_encoding: "gzip, deflate, br, zstd",
        // Firefox doesn't send Sec-CH-UA headers
        sec_ch_ua: None,
        sec_ch_ua_platform: None,
    }
}

/// Generate a Safari profile
#[must_use]
pub fn safari_profile() -> BrowserProfile {
    let (version, webkit) = pick(SAFARI_VERSIONS);

    BrowserProfile {
        user_agent: format!(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/{webkit} (KHTML, like Gecko) Version/{version} Safari/{webkit}"
        ),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        accept_language: random_accept_language(),
        accept_encoding: "gzip, deflate, br",
        sec_ch_ua: None,
        sec_ch_ua_platform: None,
    }
}

/// Generate a random browser profile (weighted by market share)
#[must_use]
pub fn random_profile() -> BrowserProfile {
    let roll: f32 = rand::thread_rng().gen();
    if roll < 0.65 {
        chrome_profile()
    } else if roll < 0.85 {
        safari_profile()
    } else {
        firefox_profile()
    }
}

impl BrowserProfile {
    /// Convert profile to reqwest `HeaderMap`
    ///
    /// Values that fail header validation are skipped rather than sent
    /// malformed.
    pub fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static(self.accept));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(self.accept_language));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(self.accept_encoding));

        if let Some(value) = self.sec_ch_ua.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert("Sec-CH-UA", value);
            headers.insert("Sec-CH-UA-Mobile", HeaderValue::from_static("?0"));
        }
        if let Some(platform) = self.sec_ch_ua_platform {
            headers.insert("Sec-CH-UA-Platform", HeaderValue::from_static(platform));
        }

        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
        headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

        headers
    }
}
