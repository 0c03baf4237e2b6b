mod flow;
mod image;
mod post;
mod project;
mod research;
