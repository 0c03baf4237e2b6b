use std::collections::BTreeMap;

use crosslist::{ConfirmPost, DashboardBuilder, Event, FlowConnection, FlowModel, GenerateContent, NewProject, ProcessImages, SearchRequest};
use serde_json::json;

fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let dashboard = DashboardBuilder::new().async_worker_thread_number(1).build().unwrap();
    let mut events = dashboard.subscribe();
    let posts = dashboard.posts();

    let research = posts.search(&SearchRequest::new("Brass desk lamp")).unwrap();
    println!("Search: {}", research);

    let mut input = NewProject::new("Brass desk lamp", "home");
    input.condition = "good".to_string();
    input.description = "Solid brass, rewired last year.".to_string();
    input.research = Some(research);
    let project = posts.create_project(&input).unwrap();

    posts.run_deep_research(&project.id).unwrap();
    posts.generate_content(&project.id, &GenerateContent::new(&["ebay", "facebook", "mercari"])).unwrap();
    posts
        .process_images(
            &project.id,
            &ProcessImages {
                images: vec!["uploads/lamp-front.jpg".to_string(), "uploads/lamp-base.jpg".to_string()],
            },
        )
        .unwrap();
    posts.customize(&project.id, BTreeMap::from([("content".to_string(), json!({"mercari": "Brass lamp, works great. $45"}))])).unwrap();
    let project = posts.confirm_post(&project.id, &ConfirmPost::default()).unwrap();
    println!("Project {} is at stage {}", project.id, project.stage);

    for post in posts.post_history(&project.id).unwrap() {
        println!("[{}] {} at {}:\n{}\n", post.status, post.platform, post.scheduled_at, post.content);
    }

    let flows = dashboard.flows();
    let flow = flows.create_flow(FlowModel::from_json(include_str!("./flow.json")).unwrap()).unwrap();
    println!("Validation: {}", serde_json::to_string(&flows.validate(&flow.id).unwrap()).unwrap());

    if let Err(e) = flows.activate(&flow.id) {
        println!("Activation refused: {}", e);
    }
    flows.add_connection(&flow.id, FlowConnection::new("c3", "n3", "n4")).unwrap();
    let flow = flows.activate(&flow.id).unwrap();
    println!("Flow {} is {}", flow.name, flow.status);

    while let Ok(event) = events.try_recv() {
        match event {
            Event::Project(e) => println!("project {} {} -> {}", e.pid, e.action.as_ref(), e.stage),
            Event::Flow(e) => println!("flow {} -> {}", e.fid, e.status),
        }
    }
}
