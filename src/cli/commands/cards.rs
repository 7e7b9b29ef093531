// Flashcard data commands; each one runs the page-load flow first
use super::api_client;
use crate::cli::{ForvoCommand, MinimalPairsCommand, ShadowingCommand};
use crate::error::Result;
use crate::models::{sort_pronunciations, Phrase, Pronunciation, Table};

fn print_phrase(phrase: &Phrase) {
    println!("[{}] {}", phrase.card_id, phrase.phrase);
    if !phrase.phrase_stress.is_empty() && phrase.phrase_stress != phrase.phrase {
        println!("  Stress:      {}", phrase.phrase_stress);
    }
    if !phrase.translation.is_empty() {
        println!("  Translation: {}", phrase.translation);
    }
    if !phrase.audio.is_empty() {
        println!("  Audio:       {}", phrase.audio);
    }
}

fn print_pronunciations(pronunciations: &[Pronunciation]) {
    if pronunciations.is_empty() {
        println!("  (no recordings)");
        return;
    }
    for p in sort_pronunciations(pronunciations) {
        println!("  {} ({}, {}) {}", p.username, p.country, p.sex, p.audio_mp3);
    }
}

pub async fn phrase(page_url: Option<&str>, id: &str) -> Result<()> {
    let api = api_client(page_url).await?;
    print_phrase(&api.phrase_by_id(id).await?);
    Ok(())
}

pub async fn count(page_url: Option<&str>, table: Table) -> Result<()> {
    let api = api_client(page_url).await?;
    println!("{}", api.count(table).await?);
    Ok(())
}

pub async fn search(page_url: Option<&str>, query: &str) -> Result<()> {
    let api = api_client(page_url).await?;
    let phrases = api.search_examples(query).await?;
    if phrases.is_empty() {
        println!("No phrases match '{}'", query);
    }
    for phrase in &phrases {
        print_phrase(phrase);
    }
    Ok(())
}

pub async fn word(page_url: Option<&str>, word: &str, sentence: &str, stress: bool) -> Result<()> {
    let api = api_client(page_url).await?;
    let data = api.word_data(word, sentence, stress).await?;
    println!("{}", data.base_form_stress);
    println!("  Base form:   {}", data.base_form);
    println!("  Translation: {}", data.english_translation);
    println!("  Meaning:     {}", data.russian_meaning);
    Ok(())
}

pub async fn stress(page_url: Option<&str>, text: &str) -> Result<()> {
    let api = api_client(page_url).await?;
    match api.stressed(text).await? {
        Some(stressed) => println!("{}", stressed),
        None => println!("{}", text),
    }
    Ok(())
}

pub async fn variations(page_url: Option<&str>, word: &str) -> Result<()> {
    let api = api_client(page_url).await?;
    for form in api.word_variations(word).await? {
        println!("{}", form);
    }
    Ok(())
}

pub async fn synthesize(page_url: Option<&str>, sentence: &str) -> Result<()> {
    let api = api_client(page_url).await?;
    match api.synthesize(sentence).await? {
        Some(url) => println!("{}", url),
        None => println!("No audio returned"),
    }
    Ok(())
}

pub async fn base_form(page_url: Option<&str>, sentence: &str, words: &str) -> Result<()> {
    let api = api_client(page_url).await?;
    let form = api.phrase_base_form(sentence, words).await?;
    println!("{}", form.base_form);
    println!("  Answer:   {}", form.phrase_answer);
    println!("  Sentence: {}", form.bracketed_sentence);
    Ok(())
}

pub async fn forvo(page_url: Option<&str>, command: ForvoCommand) -> Result<()> {
    let api = api_client(page_url).await?;
    match command {
        ForvoCommand::Search { phrase } => {
            for result in api.forvo_search(&phrase).await? {
                println!("{}  {}", result.phrase, result.audio);
            }
        }
        ForvoCommand::Pronunciations { word } => {
            println!("{}", word);
            print_pronunciations(&api.forvo_pronunciations(&word).await?);
        }
    }
    Ok(())
}

pub async fn shadowing(page_url: Option<&str>, command: ShadowingCommand) -> Result<()> {
    let api = api_client(page_url).await?;
    match command {
        ShadowingCommand::Get { id } => {
            let entity = api.shadowing_by_id(&id).await?;
            println!("{}", entity.entity.sentence);
            print_pronunciations(&entity.pronunciations);
        }
        ShadowingCommand::Add { sentence, difficulty } => {
            let created = api.add_shadowing(&sentence, difficulty).await?;
            println!("✓ Added shadowing sentence {}", created.row_key);
        }
    }
    Ok(())
}

pub async fn minimal_pairs(page_url: Option<&str>, command: MinimalPairsCommand) -> Result<()> {
    let api = api_client(page_url).await?;
    match command {
        MinimalPairsCommand::Get { id } => {
            let entity = api.minimal_pair_by_id(&id).await?;
            println!("{}", entity.entity.pair);
            println!("First word:");
            print_pronunciations(&entity.pronunciations1);
            println!("Second word:");
            print_pronunciations(&entity.pronunciations2);
        }
        MinimalPairsCommand::Add { pair, difficulty } => {
            let created = api.add_minimal_pair(&pair, difficulty).await?;
            println!("✓ Added minimal pair {}", created.row_key);
        }
    }
    Ok(())
}
