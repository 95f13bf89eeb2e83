//! Splits sites into work and play using static keyword lists. There is no learning here, a site
//! belongs to a bucket if its name contains one of the bucket's keywords.

use std::fmt::Display;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    tracker::{site::Site, totals::Totals},
    utils::percentage::{minutes_percentage, Percentage},
};

const WORK_KEYWORDS: &[&str] = &[
    "github",
    "gitlab",
    "stackoverflow",
    "docs",
    "sheets",
    "slides",
    "drive",
    "google",
    "gmail",
    "mail",
    "email",
    "calendar",
    "office",
    "documents",
    "communication",
    "notion",
    "slack",
    "linkedin",
    "coding",
    "figma",
    "jira",
    "confluence",
    "desmos",
    "bluebook",
    "apclassroom",
];

const PLAY_KEYWORDS: &[&str] = &[
    "youtube",
    "shorts",
    "reels",
    "reddit",
    "twitter",
    "x.com",
    "facebook",
    "instagram",
    "snapchat",
    "tiktok",
    "social",
    "discord",
    "netflix",
    "disney",
    "twitch",
    "spotify",
    "gaming",
    "game",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Work,
    Play,
}

impl Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::Work => write!(f, "work"),
            Bucket::Play => write!(f, "play"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub work: Vec<Site>,
    pub play: Vec<Site>,
}

/// Classification together with how much time went into each bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    #[serde(flatten)]
    pub classification: Classification,
    pub work_minutes: f64,
    pub play_minutes: f64,
    pub work_percentage: Percentage,
    pub play_percentage: Percentage,
}

/// A keyword matches a site if the site contains it. Keywords that look like a domain (`x.com`)
/// have to match the whole site or one of its parent domains, so `x.com` doesn't match
/// `dropbox.com`.
#[derive(Debug, Clone)]
struct Keyword(String);

impl Keyword {
    fn matches(&self, site: &str) -> bool {
        if self.0.contains('.') {
            site == self.0
                || site
                    .strip_suffix(self.0.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        } else {
            site.contains(self.0.as_str())
        }
    }
}

fn to_keywords(values: &[impl AsRef<str>]) -> Vec<Keyword> {
    values
        .iter()
        .map(|v| Keyword(v.as_ref().to_lowercase()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct Classifier {
    work: Vec<Keyword>,
    play: Vec<Keyword>,
    default_bucket: Bucket,
}

impl Classifier {
    /// Classifier with built-in keyword lists. Sites that match nothing go into `default_bucket`.
    pub fn new(default_bucket: Bucket) -> Self {
        Self::with_keywords(WORK_KEYWORDS, PLAY_KEYWORDS, default_bucket)
    }

    pub fn with_keywords(
        work: &[impl AsRef<str>],
        play: &[impl AsRef<str>],
        default_bucket: Bucket,
    ) -> Self {
        Self {
            work: to_keywords(work),
            play: to_keywords(play),
            default_bucket,
        }
    }

    /// Play keywords win over work keywords, so `gaming.google.com` is play.
    pub fn bucket_of(&self, site: &str) -> Bucket {
        let site = site.to_lowercase();
        if self.play.iter().any(|k| k.matches(&site)) {
            Bucket::Play
        } else if self.work.iter().any(|k| k.matches(&site)) {
            Bucket::Work
        } else {
            self.default_bucket
        }
    }

    pub fn classify<'a>(&self, sites: impl IntoIterator<Item = &'a Site>) -> Classification {
        let mut classification = Classification::default();
        for site in sites {
            match self.bucket_of(site) {
                Bucket::Work => classification.work.push(site.clone()),
                Bucket::Play => classification.play.push(site.clone()),
            }
        }
        classification
    }

    pub fn breakdown(&self, totals: &Totals) -> Breakdown {
        let classification = self.classify(totals.sites());
        let sum = |sites: &[Site]| sites.iter().map(|s| totals.minutes(s)).sum::<f64>();
        let work_minutes = sum(&classification.work);
        let play_minutes = sum(&classification.play);
        let total = work_minutes + play_minutes;

        Breakdown {
            classification,
            work_minutes,
            play_minutes,
            work_percentage: minutes_percentage(work_minutes, total),
            play_percentage: minutes_percentage(play_minutes, total),
        }
    }
}
