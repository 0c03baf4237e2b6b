use crosslist::{Config, Dashboard, GenerateContent, NewProject, Stage};

fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = Config::load_from_str(
        r#"
        async_worker_thread_number = 2

        [store]
        store_type = "sqlite"

        [store.sqlite]
        database_url = "sqlite://crosslist.db"
        "#,
    )
    .unwrap();
    let dashboard = Dashboard::new_with_config(config).unwrap();
    let posts = dashboard.posts();

    let project = posts.create_project(&NewProject::new("Road bike", "sports")).unwrap();
    posts.run_deep_research(&project.id).unwrap();
    posts.generate_content(&project.id, &GenerateContent::new(&["craigslist", "facebook"])).unwrap();

    for project in posts.list_projects(Some(Stage::Writing)).unwrap() {
        println!("{} {} ({})", project.id, project.item_name, project.stage);
        for (platform, text) in project.generated_content.iter() {
            println!("--- {}\n{}", platform, text);
        }
    }
}
