/// A hand-picked, tested bundle of products with one affiliate list link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kit {
    pub slug: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub image_url: &'static str,
    pub affiliate_url: &'static str,
}

pub const KITS: &[Kit] = &[
    Kit {
        slug: "park-day",
        title: "Park Day Kit",
        description: "Everything for outdoor adventures that won't break, leak, or disappoint you when it matters most.",
        image_url: "https://images.unsplash.com/photo-1661788902947-19ff0d8f50ea",
        affiliate_url: "https://www.amazon.com/shop/haarisshariff/list/19LAI2JMPGQJT",
    },
    Kit {
        slug: "desk-setup",
        title: "Desk Setup Kit",
        description: "Productivity gear that actually makes you productive. No RGB nonsense, no aesthetic fluff.",
        image_url: "https://images.unsplash.com/photo-1586202690666-e1f32e218afe",
        affiliate_url: "https://www.amazon.com/shop/haarisshariff/list/11EQI7H7IWUUE",
    },
    Kit {
        slug: "smart-home",
        title: "Smart Home Setup",
        description: "Home automation without the computer science degree requirement or endless troubleshooting.",
        image_url: "https://images.unsplash.com/photo-1525004351186-bdc426f3efaa",
        affiliate_url: "https://www.amazon.com/shop/haarisshariff/list/2JU1WTBQMG48Y",
    },
    Kit {
        slug: "skin-care",
        title: "Skin Care Essentials",
        description: "The routine that works without 47 steps, expensive serums, or breaking the bank.",
        image_url: "https://images.unsplash.com/photo-1633793566189-8e9fe6f817fc",
        affiliate_url: "https://www.amazon.com/shop/haarisshariff/list/RZDP1I7G8U93",
    },
];

/// Look a kit up by slug or by (case-insensitive) title.
pub fn find(name: &str) -> Option<&'static Kit> {
    let name = name.trim();
    KITS.iter()
        .find(|kit| kit.slug == name || kit.title.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn slugs_are_unique() {
        let slugs: HashSet<_> = KITS.iter().map(|k| k.slug).collect();
        assert_eq!(slugs.len(), KITS.len());
    }

    #[test]
    fn find_by_slug_or_title() {
        assert_eq!(find("desk-setup").unwrap().title, "Desk Setup Kit");
        assert_eq!(find("park day kit").unwrap().slug, "park-day");
        assert!(find("garage").is_none());
    }
}
