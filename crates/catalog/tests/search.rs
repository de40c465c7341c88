use rstest::rstest;
use time::{Duration, OffsetDateTime};
use tribe_catalog::search::{ClearedFilter, UploadedWithin};
use tribe_catalog::{Database, Difficulty, FeaturedMode, NewLevel, Repository, SearchQuery, SortOrder, User};
use tribe_ident::LevelId;

struct Catalog {
    db: Database,
    repo: Repository,
    author: User,
    fan: User,
}

impl Catalog {
    async fn new() -> Self {
        let db = Database::in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let author = repo.insert_user("mario").await.unwrap();
        let fan = repo.insert_user("luigi").await.unwrap();
        Self { db, repo, author, fan }
    }

    async fn add(&self, n: u16, name: &str) -> LevelId {
        let level = NewLevel {
            id: LevelId::from_hex(&format!("{n:04X}ABCDABCDABCD")).unwrap(),
            fingerprint: format!("{n:064x}"),
            name: name.to_string(),
            style: (n % 4) as u8,
            environment: 0,
            tags: ["standard".into(), "music".into()],
            created_at: OffsetDateTime::now_utc(),
            author_id: self.author.id,
            non_latin: false,
            testing_client: false,
            description: None,
            upload_limit: None,
        };
        self.repo.insert_level(&level).await.unwrap().id
    }

    async fn exec(&self, sql: &str, id: &LevelId) {
        sqlx::query(sql).bind(id.as_str()).execute(self.db.pool()).await.unwrap();
    }

    async fn names(&self, query: &SearchQuery) -> Vec<String> {
        let page = self.repo.search(query).await.unwrap();
        page.levels.into_iter().map(|l| l.name).collect()
    }
}

#[tokio::test]
async fn test_empty_catalog() {
    let catalog = Catalog::new().await;
    let query = SearchQuery { featured: Some(FeaturedMode::Promising), ..SearchQuery::new(5) };
    let page = catalog.repo.search(&query).await.unwrap();
    assert_eq!(page.num_rows, 0);
    assert_eq!(page.pages, 0);
    assert!(page.levels.is_empty());
}

#[rstest]
#[case(1, 5)]
#[case(5, 5)]
#[case(6, 5)]
#[case(11, 5)]
#[case(12, 3)]
#[tokio::test]
async fn test_pagination_bounds(#[case] count: u16, #[case] rows_per_page: u32) {
    let catalog = Catalog::new().await;
    for n in 0..count {
        catalog.add(n, &format!("Level {n}")).await;
    }
    let mut seen = 0;
    let first = catalog.repo.search(&SearchQuery::new(rows_per_page)).await.unwrap();
    let rpp = u64::from(rows_per_page);
    assert_eq!(first.num_rows, u64::from(count));
    assert!(rpp * (first.pages - 1) < first.num_rows && first.num_rows <= rpp * first.pages);
    for page in 1..=first.pages {
        let query = SearchQuery { page: page as i64, ..SearchQuery::new(rows_per_page) };
        let result = catalog.repo.search(&query).await.unwrap();
        assert!(result.levels.len() as u64 <= rpp);
        seen += result.levels.len();
    }
    assert_eq!(seen, usize::from(count));
}

#[tokio::test]
async fn test_page_below_one_is_first_page() {
    let catalog = Catalog::new().await;
    for n in 0..3 {
        catalog.add(n, &format!("Level {n}")).await;
    }
    let first = catalog.names(&SearchQuery::new(2)).await;
    for page in [0, -4] {
        let query = SearchQuery { page, ..SearchQuery::new(2) };
        let result = catalog.repo.search(&query).await.unwrap();
        assert_eq!(result.page, 1);
        assert_eq!(result.levels.into_iter().map(|l| l.name).collect::<Vec<_>>(), first);
    }
}

#[tokio::test]
async fn test_default_order_is_newest_first() {
    let catalog = Catalog::new().await;
    catalog.add(1, "first").await;
    catalog.add(2, "second").await;
    catalog.add(3, "third").await;
    assert_eq!(catalog.names(&SearchQuery::new(5)).await, ["third", "second", "first"]);
    let oldest = SearchQuery { sort: Some(SortOrder::Oldest), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&oldest).await, ["first", "second", "third"]);
}

#[tokio::test]
async fn test_title_matches_substring_literally() {
    let catalog = Catalog::new().await;
    catalog.add(1, "Castle of Doom").await;
    catalog.add(2, "100% Speedrun").await;
    catalog.add(3, "1000 Speedrun").await;
    let castle = SearchQuery { title: Some("castle".into()), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&castle).await, ["Castle of Doom"]);
    let percent = SearchQuery { title: Some("100%".into()), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&percent).await, ["100% Speedrun"]);
}

#[tokio::test]
async fn test_author_style_and_environment() {
    let catalog = Catalog::new().await;
    catalog.add(1, "one").await;
    catalog.add(2, "two").await;
    let by_author = SearchQuery { author: Some("mario".into()), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&by_author).await.len(), 2);
    let by_other = SearchQuery { author: Some("luigi".into()), ..SearchQuery::new(5) };
    assert!(catalog.names(&by_other).await.is_empty());
    let by_style = SearchQuery { style: Some(2), environment: Some(0), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&by_style).await, ["two"]);
}

#[tokio::test]
async fn test_uploaded_within() {
    let catalog = Catalog::new().await;
    catalog.add(1, "fresh").await;
    let old = catalog.add(2, "old").await;
    let ten_days_ago = (OffsetDateTime::now_utc() - Duration::days(10)).unix_timestamp();
    sqlx::query("UPDATE levels SET created_at = ? WHERE level_id = ?")
        .bind(ten_days_ago)
        .bind(old.as_str())
        .execute(catalog.db.pool())
        .await
        .unwrap();
    let week = SearchQuery { uploaded_within: Some("7d".parse().unwrap()), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&week).await, ["fresh"]);
    let month = SearchQuery { uploaded_within: Some(UploadedWithin(30)), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&month).await.len(), 2);
    let weekly = SearchQuery { featured: Some(FeaturedMode::PopularWeekly), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&weekly).await, ["fresh"]);
}

#[tokio::test]
async fn test_featured_modes() {
    let catalog = Catalog::new().await;
    let a = catalog.add(1, "plain").await;
    let b = catalog.add(2, "featured").await;
    let c = catalog.add(3, "loved").await;
    catalog.repo.set_featured(&b, true).await.unwrap();
    catalog.exec("UPDATE levels SET likes = 10, dislikes = 1 WHERE level_id = ?", &a).await;
    catalog.exec("UPDATE levels SET likes = 3 WHERE level_id = ?", &c).await;

    let promising = SearchQuery { featured: Some(FeaturedMode::Promising), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&promising).await, ["featured"]);
    let not_promising = SearchQuery { featured: Some(FeaturedMode::NotPromising), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&not_promising).await, ["loved", "plain"]);
    let popular = SearchQuery { featured: Some(FeaturedMode::Popular), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&popular).await, ["plain", "loved", "featured"]);
}

#[tokio::test]
async fn test_membership_filters() {
    let catalog = Catalog::new().await;
    let liked = catalog.add(1, "liked").await;
    let disliked = catalog.add(2, "disliked").await;
    let cleared = catalog.add(3, "cleared").await;
    let fan = catalog.fan.id;
    catalog.repo.add_like(&liked, fan).await.unwrap();
    catalog.repo.add_dislike(&disliked, fan).await.unwrap();
    catalog.repo.add_clear(&cleared, fan, 1_000, true).await.unwrap();

    let query = SearchQuery { liked_by: Some(fan), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&query).await, ["liked"]);
    let query = SearchQuery { disliked_by: Some(fan), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&query).await, ["disliked"]);
    let query = SearchQuery { cleared: Some(ClearedFilter { user_id: fan, cleared: true }), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&query).await, ["cleared"]);
    let query = SearchQuery { cleared: Some(ClearedFilter { user_id: fan, cleared: false }), ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&query).await, ["disliked", "liked"]);
    let query = SearchQuery { liked_by: Some(catalog.author.id), ..SearchQuery::new(5) };
    assert!(catalog.names(&query).await.is_empty());
}

#[tokio::test]
async fn test_difficulty_bands() {
    let catalog = Catalog::new().await;
    let cases = [("unplayed", 0, 0), ("easy", 10, 8), ("normal", 10, 5), ("hard", 10, 3), ("expert", 10, 2)];
    for (n, (name, plays, clears)) in cases.iter().enumerate() {
        let id = catalog.add(n as u16, name).await;
        sqlx::query("UPDATE levels SET plays = ?, clears = ? WHERE level_id = ?")
            .bind(plays)
            .bind(clears)
            .bind(id.as_str())
            .execute(catalog.db.pool())
            .await
            .unwrap();
    }
    let expected = [
        (Difficulty::Easy, "easy"),
        (Difficulty::Normal, "normal"),
        (Difficulty::Hard, "hard"),
        (Difficulty::Expert, "expert"),
    ];
    for (difficulty, name) in expected {
        let query = SearchQuery { difficulty: Some(difficulty), ..SearchQuery::new(5) };
        assert_eq!(catalog.names(&query).await, [name], "{difficulty:?}");
    }
}

#[tokio::test]
async fn test_hide_testing_levels() {
    let catalog = Catalog::new().await;
    catalog.add(1, "stable").await;
    let testing = catalog.add(2, "testing").await;
    catalog.exec("UPDATE levels SET testing_client = 1 WHERE level_id = ?", &testing).await;
    let query = SearchQuery { hide_testing: true, ..SearchQuery::new(5) };
    assert_eq!(catalog.names(&query).await, ["stable"]);
    assert_eq!(catalog.names(&SearchQuery::new(5)).await.len(), 2);
}

#[tokio::test]
async fn test_filters_are_conjunctive() {
    let catalog = Catalog::new().await;
    let a = catalog.add(1, "Castle A").await;
    catalog.add(2, "Castle B").await;
    catalog.repo.set_featured(&a, true).await.unwrap();
    let query = SearchQuery {
        title: Some("Castle".into()),
        featured: Some(FeaturedMode::Promising),
        author: Some("mario".into()),
        ..SearchQuery::new(5)
    };
    let page = catalog.repo.search(&query).await.unwrap();
    assert_eq!(page.num_rows, 1);
    assert_eq!(page.levels[0].id, a);
}
