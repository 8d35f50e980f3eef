use prettytable::{cell, row, Table};
use structopt::StructOpt;

use gxs_config::config::Config;
use gxs_node::{
    collaborators::{NullDirectory, StaticFriends},
    storage_mngr,
};
use gxs_reputation::{
    collaborators::MemoryPersistence, Assessment, Collaborators, ReputationEngine,
};
use gxs_util::timestamp::{get_timestamp, pretty_print};

pub fn exec(params: ListParams, config: &Config) -> anyhow::Result<()> {
    let backend = storage_mngr::create_appropriate_backend(&config.storage)?;
    let mut persistence = storage_mngr::StoragePersistence::new(backend);
    let friends = StaticFriends::new(config.friends.peers.clone());

    let mut engine = ReputationEngine::new(config.reputation.engine_params());
    if !engine.load(&mut persistence, &friends) {
        println!("No reputation data found");
        return Ok(());
    }

    // Automatic bans are not persisted, one maintenance pass derives them again
    engine.tick(
        get_timestamp(),
        vec![],
        &mut Collaborators {
            directory: &NullDirectory,
            friends: &friends,
            persistence: &mut MemoryPersistence::default(),
        },
    );

    let mut records: Vec<_> = engine.store().records().collect();
    records.sort_by_key(|(persona, _)| **persona);

    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row![
        "Persona",
        "Own opinion",
        "Since",
        r->"Friends +",
        r->"Friends -",
        r->"Friends avg",
        r->"Score",
        "Assessment"
    ]);

    let mut shown = 0;
    for (persona, record) in records {
        let info = engine.get_reputation_info(persona, None);
        if params.bad && info.assessment != Assessment::Bad {
            continue;
        }

        table.add_row(row![
            persona.to_string(),
            info.own_opinion.to_string(),
            pretty_print(record.own_opinion_ts),
            r->info.friends_positive_votes,
            r->info.friends_negative_votes,
            r->format!("{:.4}", info.friend_average),
            r->format!("{:.4}", info.overall_score),
            format!("{:?}", info.assessment)
        ]);
        shown += 1;
    }

    if shown > 0 {
        table.printstd();
    }

    let stats = engine.statistics();
    println!(
        "{} records shown, {} stored, owner nodes banned: {} automatically, {} by hand, {} friends",
        shown,
        stats.records,
        stats.auto_banned_nodes,
        stats.explicitly_banned_nodes,
        stats.peers
    );

    Ok(())
}

#[derive(Debug, StructOpt)]
pub struct ListParams {
    /// Only show personas assessed as bad.
    #[structopt(long = "bad")]
    bad: bool,
}
