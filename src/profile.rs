use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct Social {
    pub label: &'static str,
    pub icon: &'static str,
    pub url: &'static str,
    pub color: &'static str,
}

impl Social {
    pub fn is_brand_icon(&self) -> bool {
        ["github", "discord", "instagram", "spotify", "steam", "twitch"]
            .contains(&self.icon.to_ascii_lowercase().as_str())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Track {
    pub title: &'static str,
    pub artist: &'static str,
    pub url: &'static str,
}

/// Background track served with the page.
#[derive(Clone, Debug, Serialize)]
pub struct AudioSource {
    pub src: &'static str,
    pub volume: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct SetupItem {
    pub icon: &'static str,
    pub label: &'static str,
    pub value: &'static str,
    pub urls: &'static [&'static str],
}

#[derive(Clone, Debug, Serialize)]
pub struct Profile {
    pub name: &'static str,
    pub bio: &'static str,
    pub avatar: &'static str,
    pub location: &'static str,
    pub socials: Vec<Social>,
    pub music: Track,
    pub audio: AudioSource,
    pub pc: Vec<SetupItem>,
    pub gear: Vec<SetupItem>,
}

impl Profile {
    /// Setup entry by label, exact match first, then prefix.
    pub fn find_setup_item(&self, query: &str) -> Option<&SetupItem> {
        let query = query.trim().to_ascii_lowercase();
        let items = || self.pc.iter().chain(self.gear.iter());
        items()
            .find(|item| item.label.to_ascii_lowercase() == query)
            .or_else(|| items().find(|item| item.label.to_ascii_lowercase().starts_with(&query)))
    }

    pub fn find_social(&self, query: &str) -> Option<&Social> {
        let query = query.trim().to_ascii_lowercase();
        self.socials
            .iter()
            .find(|social| social.label.to_ascii_lowercase() == query)
            .or_else(|| {
                self.socials
                    .iter()
                    .find(|social| social.label.to_ascii_lowercase().starts_with(&query))
            })
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "Piotrunius",
            bio: "Minimalist designer & developer. Linux enthusiast from Katowice.",
            avatar: "assets/pfp.png",
            location: "Katowice, PL",
            socials: vec![
                social("GitHub", "github", "https://github.com/Piotrunius", "#ffffff"),
                social("Discord", "discord", "https://discord.gg/wsQujjvk", "#5865F2"),
                social(
                    "Instagram",
                    "instagram",
                    "https://www.instagram.com/piotrunius0/",
                    "#E1306C",
                ),
                social("Spotify", "spotify", "https://stats.fm/piotrunius", "#1DB954"),
                social("Steam", "steam", "https://steamcommunity.com/id/Piotrunius/", "#00adee"),
                social("Bio", "file", "https://e-z.bio/piotrunius", "#9146FF"),
                social("AniList", "circle-play", "https://anilist.co/user/Piotrunius/", "#00A3FF"),
                social(
                    "Roblox",
                    "cubes",
                    "https://www.roblox.com/users/962249141/profile",
                    "#FF4757",
                ),
                social("Minecraft", "gem", "https://pl.namemc.com/profile/Piotrunius", "#3C873A"),
            ],
            music: Track {
                title: "Smoking Alone",
                artist: "BackDrop",
                url: "https://pixabay.com/music/ambient-dark-ambient-background-music-smoking-alone-328352/",
            },
            audio: AudioSource {
                src: "assets/audio.mp3",
                volume: 0.4,
            },
            pc: vec![
                item(
                    "microchip",
                    "CPU",
                    "Intel Core i5-13400F",
                    &["https://www.google.com/search?q=Intel+Core+i5-13400F"],
                ),
                item(
                    "video",
                    "GPU",
                    "Nvidia GeForce RTX 4060 Ti (16GB)",
                    &["https://www.google.com/search?q=Nvidia+GeForce+RTX+4060+Ti"],
                ),
                item(
                    "network-wired",
                    "Motherboard",
                    "Gigabyte B760 GAMING X DDR4",
                    &["https://www.google.com/search?q=Gigabyte+B760+GAMING+X+DDR4"],
                ),
                item(
                    "memory",
                    "RAM",
                    "Kingston Fury Beast RGB (32GB DDR4)",
                    &["https://www.google.com/search?q=Kingston+Fury+Beast+RGB+DDR4"],
                ),
                item(
                    "hard-drive",
                    "Storage",
                    "Samsung 980 NVMe (1TB) + Seagate (2TB HDD)",
                    &[
                        "https://www.google.com/search?q=Samsung+980+NVMe+SSD",
                        "https://www.google.com/search?q=Seagate+2TB+HDD",
                    ],
                ),
                item(
                    "bolt",
                    "PSU",
                    "Endorfy Vero L5 Bronze (700W)",
                    &["https://www.google.com/search?q=Endorfy+Vero+L5+Bronze+700W"],
                ),
            ],
            gear: vec![
                item(
                    "display",
                    "Displays",
                    "Lenovo L2251p (75Hz) + AOC 27G2G8 (240Hz)",
                    &[
                        "https://www.google.com/search?q=Lenovo+L2251p",
                        "https://www.google.com/search?q=AOC+27G2G8+240Hz",
                    ],
                ),
                item(
                    "keyboard",
                    "Keyboard",
                    "Dark Project Terra Nova (Wireless)",
                    &["https://www.google.com/search?q=Dark+Project+Terra+Nova+keyboard"],
                ),
                item(
                    "mouse",
                    "Mouse",
                    "Dark Project Novus (Wireless)",
                    &["https://www.google.com/search?q=Dark+Project+Novus+mouse"],
                ),
                item(
                    "microphone",
                    "Microphone",
                    "Fifine AM8 RGB",
                    &["https://www.google.com/search?q=Fifine+AM8+RGB+microphone"],
                ),
                item(
                    "headset",
                    "Headphones",
                    "SteelSeries Arctis 9 (Wireless)",
                    &["https://www.google.com/search?q=SteelSeries+Arctis+9+wireless"],
                ),
                item(
                    "vr-cardboard",
                    "VR",
                    "Meta Quest 3 (128GB)",
                    &["https://www.google.com/search?q=Meta+Quest+3+128GB"],
                ),
            ],
        }
    }
}

fn social(
    label: &'static str,
    icon: &'static str,
    url: &'static str,
    color: &'static str,
) -> Social {
    Social {
        label,
        icon,
        url,
        color,
    }
}

fn item(
    icon: &'static str,
    label: &'static str,
    value: &'static str,
    urls: &'static [&'static str],
) -> SetupItem {
    SetupItem {
        icon,
        label,
        value,
        urls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_socials_by_exact_label_then_prefix() {
        let profile = Profile::default();
        assert_eq!(profile.find_social("steam").map(|s| s.label), Some("Steam"));
        assert_eq!(profile.find_social("insta").map(|s| s.label), Some("Instagram"));
        assert!(profile.find_social("myspace").is_none());
    }

    #[test]
    fn brand_icons_are_recognised() {
        let profile = Profile::default();
        assert!(profile.socials[0].is_brand_icon());
        assert!(!profile.find_social("bio").unwrap().is_brand_icon());
    }

    #[test]
    fn setup_items_are_found_across_both_lists() {
        let profile = Profile::default();
        assert_eq!(profile.find_setup_item("storage").map(|i| i.urls.len()), Some(2));
        assert_eq!(profile.find_setup_item("key").map(|i| i.label), Some("Keyboard"));
        assert!(profile.find_setup_item("toaster").is_none());
    }
}
