// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use rand::Rng;
use serde::Deserialize;

/// 出站身份：UA、与之匹配的请求头以及视口尺寸
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
    pub viewport: (u32, u32),
}

struct BrowserProfile {
    user_agent: &'static str,
    sec_ch_ua: Option<&'static str>,
    platform: Option<&'static str>,
    viewport: (u32, u32),
}

// Header sets must stay coherent with the UA family, otherwise the mismatch is a detection signal.
const PROFILES: &[BrowserProfile] = &[
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        sec_ch_ua: Some("\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\""),
        platform: Some("\"Windows\""),
        viewport: (1920, 1080),
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        sec_ch_ua: Some("\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\""),
        platform: Some("\"macOS\""),
        viewport: (1440, 900),
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        sec_ch_ua: Some("\"Chromium\";v=\"123\", \"Google Chrome\";v=\"123\", \"Not:A-Brand\";v=\"8\""),
        platform: Some("\"Linux\""),
        viewport: (1366, 768),
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        sec_ch_ua: None,
        platform: None,
        viewport: (1536, 864),
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        sec_ch_ua: None,
        platform: None,
        viewport: (1600, 900),
    },
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "es-MX,es;q=0.9,en-US;q=0.8,en;q=0.7",
    "en-US,en;q=0.9,es;q=0.8",
    "es-419,es;q=0.9,en;q=0.8",
];

/// 身份轮换配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// 自定义UA列表，为空时使用内置浏览器配置
    pub user_agents: Vec<String>,
}

/// 身份轮换器
///
/// 随机选择身份，且在多于一个候选时不会连续两次返回同一个
pub struct IdentityRotator {
    identities: Vec<Identity>,
    last: Mutex<Option<usize>>,
}

impl Default for IdentityRotator {
    fn default() -> Self {
        Self::new(&IdentityConfig::default())
    }
}

impl IdentityRotator {
    pub fn new(config: &IdentityConfig) -> Self {
        let identities = if config.user_agents.is_empty() {
            PROFILES
                .iter()
                .enumerate()
                .map(|(i, profile)| build_identity(profile, ACCEPT_LANGUAGES[i % ACCEPT_LANGUAGES.len()]))
                .collect()
        } else {
            config
                .user_agents
                .iter()
                .map(|ua| Identity {
                    user_agent: ua.clone(),
                    headers: base_headers(ACCEPT_LANGUAGES[0]),
                    viewport: (1920, 1080),
                })
                .collect()
        };

        Self {
            identities,
            last: Mutex::new(None),
        }
    }

    /// 获取下一个身份
    pub fn next_identity(&self) -> Identity {
        let mut last = self.last.lock();
        let count = self.identities.len();
        let index = if count <= 1 {
            0
        } else {
            let mut rng = rand::rng();
            let mut candidate = rng.random_range(0..count);
            if Some(candidate) == *last {
                candidate = (candidate + rng.random_range(1..count)) % count;
            }
            candidate
        };
        *last = Some(index);
        self.identities[index].clone()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

fn base_headers(accept_language: &str) -> Vec<(String, String)> {
    vec![
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.8,*/*;q=0.7"
                .to_string(),
        ),
        ("Accept-Language".to_string(), accept_language.to_string()),
        ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
        ("DNT".to_string(), "1".to_string()),
    ]
}

fn build_identity(profile: &BrowserProfile, accept_language: &str) -> Identity {
    let mut headers = base_headers(accept_language);
    if let Some(sec_ch_ua) = profile.sec_ch_ua {
        headers.push(("sec-ch-ua".to_string(), sec_ch_ua.to_string()));
        headers.push(("sec-ch-ua-mobile".to_string(), "?0".to_string()));
    }
    if let Some(platform) = profile.platform {
        headers.push(("sec-ch-ua-platform".to_string(), platform.to_string()));
    }

    Identity {
        user_agent: profile.user_agent.to_string(),
        headers,
        viewport: profile.viewport,
    }
}
