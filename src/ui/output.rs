use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::DATABASE, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}
