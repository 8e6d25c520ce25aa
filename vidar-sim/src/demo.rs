//! The demo command set: ping, pong, subc, subg, minmax and hero.

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use vidar::{ArgumentOptions, ChoiceValue, DEFAULT_KEY, HandlerMap, Vidar};

const HEROES: &[(&str, &str)] = &[
    ("batman", "Rich"),
    ("superman", "Powered Immigrant"),
    ("spiderman", "Mutant-ish"),
    ("hulk", "Radiated Monster"),
    ("vision", "Powered Android"),
    ("flash", "Speedster"),
];

#[derive(Default)]
struct Directory {
    groups: Vec<(String, String)>,
    users: Vec<(String, String)>,
}

pub fn declare(vidar: &Vidar) -> Result<()> {
    vidar
        .command("ping", "Ping.")
        .action(|interaction| async move { interaction.reply("Pong!").await })?;

    vidar
        .command("pong", "Reunping.")
        .argument_with(
            ArgumentOptions::new("[color]").with_description("What is your favorite color?"),
        )
        .action(|interaction| async move {
            let text = match interaction.string("color") {
                Some(color) => format!("{color} is a great color! Ping."),
                None => "Poooooong. Why no color?".to_string(),
            };
            interaction.reply(text).await
        })?;

    let color: Arc<Mutex<Option<String>>> = Arc::default();
    let stored = color.clone();
    vidar
        .command("subc", "Subcommand test")
        .argument("set <color> [msg]")
        .argument("get")
        .actions(
            HandlerMap::new()
                .route("set", move |interaction| {
                    let stored = stored.clone();
                    async move {
                        let value = interaction.string("color").unwrap_or_default().to_string();
                        let msg = interaction.string("msg").unwrap_or_default().to_string();
                        *stored.lock() = Some(value.clone());
                        interaction
                            .reply(format!("Set color to {value}! {msg}").trim_end().to_string())
                            .await
                    }
                })
                .route("get", move |interaction| {
                    let color = color.clone();
                    async move {
                        let current = color.lock().clone();
                        let text = match current {
                            Some(value) => format!("Color is {value}!"),
                            None => "Set the color first!".to_string(),
                        };
                        interaction.reply(text).await
                    }
                }),
        )?;

    let directory: Arc<Mutex<Directory>> = Arc::default();
    let (groups_add, groups_get, users_add, users_get) = (
        directory.clone(),
        directory.clone(),
        directory.clone(),
        directory,
    );
    vidar
        .command("subg", "Subgroup test")
        .arguments([
            "group add <name> <description>",
            "group get <name>",
            "user add <user: user> <data>",
            "user get <user: user>",
        ])
        .docs([
            ("group", "Manage groups."),
            ("group add", "Add a group."),
            ("group get", "Look up a group by name."),
            ("user", "Manage user data."),
            ("user add", "Store data for a user."),
            ("user get", "Look up data stored for a user."),
        ])
        .actions(
            HandlerMap::new()
                .route("group add", move |interaction| {
                    let directory = groups_add.clone();
                    async move {
                        let name = interaction.string("name").unwrap_or_default().to_string();
                        let description = interaction
                            .string("description")
                            .unwrap_or_default()
                            .to_string();
                        directory.lock().groups.push((name.clone(), description));
                        interaction.reply(format!("Added group *{name}*.")).await
                    }
                })
                .route("group get", move |interaction| {
                    let directory = groups_get.clone();
                    async move {
                        let wanted = interaction.string("name").unwrap_or_default();
                        let found = directory
                            .lock()
                            .groups
                            .iter()
                            .find(|(name, _)| name == wanted)
                            .cloned();
                        let text = match found {
                            Some((name, description)) => {
                                format!("Found *{name}* with description: {description}")
                            }
                            None => "Unable to find group with that name.".to_string(),
                        };
                        interaction.reply(text).await
                    }
                })
                .route("user add", move |interaction| {
                    let directory = users_add.clone();
                    async move {
                        let user = interaction.string("user").unwrap_or_default().to_string();
                        let data = interaction.string("data").unwrap_or_default().to_string();
                        directory.lock().users.push((user.clone(), data));
                        interaction.reply(format!("Added user *{user}*.")).await
                    }
                })
                .route("user get", move |interaction| {
                    let directory = users_get.clone();
                    async move {
                        let wanted = interaction.string("user").unwrap_or_default();
                        let found = directory
                            .lock()
                            .users
                            .iter()
                            .find(|(user, _)| user == wanted)
                            .cloned();
                        let text = match found {
                            Some((user, data)) => format!("Found data for *{user}*: {data}"),
                            None => "Unable to find data for that user.".to_string(),
                        };
                        interaction.reply(text).await
                    }
                }),
        )?;

    vidar
        .command("minmax", "Testing min and max.")
        .argument("<value: 27 > l > 3> [multiplier: 1 < x < 3]")
        .docs([
            ("value", "Text to repeat."),
            ("multiplier", "How many times to repeat it."),
        ])
        .actions(HandlerMap::new().route(DEFAULT_KEY, |interaction| async move {
            let value = interaction.string("value").unwrap_or_default();
            let times = interaction.integer("multiplier").unwrap_or(1).max(0);
            let repeated = value.repeat(usize::try_from(times).unwrap_or(1));
            interaction.reply(format!("Value: {repeated}")).await
        }))?;

    vidar
        .command("hero", "Find hero data.")
        .argument("<*name>")
        .autocomplete("<*name>", |request| async move {
            Ok(closest_heroes(&request.query)
                .into_iter()
                .map(ChoiceValue::from)
                .collect())
        })
        .action(|interaction| async move {
            let name = interaction.string("name").unwrap_or_default();
            let kind = HEROES
                .iter()
                .find(|(hero, _)| *hero == name)
                .map_or("Unknown", |(_, kind)| *kind);
            interaction
                .reply(format!("Hero {name} is of type: {kind}."))
                .await
        })?;

    Ok(())
}

/// Heroes ordered by how close their first letter is to the query's.
fn closest_heroes(query: &str) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = HEROES.iter().map(|(name, _)| *name).collect();
    if let Some(first) = query.to_lowercase().chars().next() {
        let first = first as i64;
        names.sort_by_key(|name| {
            let lead = name.chars().next().map_or(0, |c| c as i64);
            (lead - first).abs()
        });
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heroes_sort_by_first_letter() {
        assert_eq!(closest_heroes("s")[..2], ["superman", "spiderman"]);
        assert_eq!(closest_heroes("")[0], "batman");
        assert_eq!(closest_heroes("H")[0], "hulk");
    }

    #[test]
    fn demo_commands_compile() {
        let vidar = Vidar::default();
        declare(&vidar).unwrap();
        assert_eq!(vidar.registry().len(), 6);
        let minmax = vidar.registry().get("minmax").unwrap();
        let value = &minmax.tree().arguments[0];
        assert_eq!(value.min_length, Some(3));
        assert_eq!(value.max_length, Some(27));
        assert_eq!(value.description, "Text to repeat.");
    }
}
