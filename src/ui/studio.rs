/// Image Generation Studio view
///
/// Prompt, the four generation sliders, the generated image list and
/// the history summary.

use chrono::Local;
use iced::widget::{
    button, column, container, horizontal_space, image, row, scrollable, slider, text, text_input,
    Column,
};
use iced::{Alignment, Color, ContentFit, Element, Length};

use crate::state::data::{
    GeneratedImageRecord, Setting, DIMENSION_MAX, DIMENSION_MIN, DIMENSION_STEP, GUIDANCE_MAX,
    GUIDANCE_MIN, GUIDANCE_STEP, STEPS_MAX, STEPS_MIN,
};
use crate::state::session::Session;
use crate::ui::thumbnails::{Thumbnail, Thumbnails, THUMBNAIL_SIZE};
use crate::Message;

const NEON_GREEN: Color = Color { r: 0.2, g: 1.0, b: 0.4, a: 1.0 };
const NEON_PINK: Color = Color { r: 1.0, g: 0.4, b: 0.7, a: 1.0 };
const ERROR_RED: Color = Color { r: 1.0, g: 0.45, b: 0.45, a: 1.0 };
const MUTED: Color = Color { r: 0.6, g: 0.6, b: 0.6, a: 1.0 };

pub fn view<'a>(session: &'a Session, thumbnails: &'a Thumbnails) -> Element<'a, Message> {
    let generating = session.is_generating();
    let settings = session.settings();

    let mut prompt_input =
        text_input("Describe the image you want to generate...", session.prompt()).padding(10);
    if !generating {
        prompt_input = prompt_input
            .on_input(Message::PromptChanged)
            .on_submit(Message::Generate);
    }

    // Sliders stay interactive while generating; the session ignores edits then
    let sliders = column![
        text(format!("Width: {}px", settings.width)).color(NEON_PINK),
        slider(DIMENSION_MIN..=DIMENSION_MAX, settings.width, |v| {
            Message::SettingChanged(Setting::Width(v))
        })
        .step(DIMENSION_STEP),
        text(format!("Height: {}px", settings.height)).color(NEON_PINK),
        slider(DIMENSION_MIN..=DIMENSION_MAX, settings.height, |v| {
            Message::SettingChanged(Setting::Height(v))
        })
        .step(DIMENSION_STEP),
        text(format!("Steps: {}", settings.steps)).color(NEON_PINK),
        slider(STEPS_MIN..=STEPS_MAX, settings.steps, |v| {
            Message::SettingChanged(Setting::Steps(v))
        }),
        text(format!("Guidance: {}", settings.guidance)).color(NEON_PINK),
        slider(GUIDANCE_MIN..=GUIDANCE_MAX, settings.guidance, |v| {
            Message::SettingChanged(Setting::Guidance(v))
        })
        .step(GUIDANCE_STEP),
    ]
    .spacing(6);

    let generate_label = if generating {
        "Generating..."
    } else {
        "Generate Image"
    };
    let actions = row![
        button(generate_label)
            .on_press_maybe((!generating).then_some(Message::Generate))
            .padding(10),
        button("Clear History")
            .on_press(Message::ClearHistory)
            .padding(10),
    ]
    .spacing(16);

    let mut input_section = column![
        text("Prompt").color(NEON_PINK),
        prompt_input,
        text("Generation Settings").size(20).color(NEON_PINK),
        sliders,
        actions,
    ]
    .spacing(12)
    .width(Length::FillPortion(1));

    if let Some(error) = session.last_error() {
        input_section = input_section.push(text(format!("Error: {error}")).color(ERROR_RED));
    }

    let preview_section = column![
        text("Generated Images").size(20).color(NEON_PINK),
        image_list(session.history(), thumbnails),
    ]
    .spacing(12)
    .width(Length::FillPortion(1));

    column![
        text("Image Generation Studio").size(28).color(NEON_GREEN),
        row![input_section, preview_section].spacing(24),
        history_panel(session),
    ]
    .spacing(20)
    .into()
}

fn image_list<'a>(
    history: &'a [GeneratedImageRecord],
    thumbnails: &'a Thumbnails,
) -> Element<'a, Message> {
    if history.is_empty() {
        return container(text("No images generated yet").color(MUTED))
            .center_x(Length::Fill)
            .center_y(Length::Fixed(256.0))
            .into();
    }

    let cards = history
        .iter()
        .enumerate()
        .map(|(index, record)| image_card(index, record, thumbnails.get(&record.id)));

    scrollable(Column::with_children(cards).spacing(12))
        .height(Length::Fixed(384.0))
        .into()
}

fn image_card<'a>(
    index: usize,
    record: &'a GeneratedImageRecord,
    thumbnail: Option<&Thumbnail>,
) -> Element<'a, Message> {
    let preview: Element<'a, Message> = match thumbnail {
        Some(Thumbnail::Ready(handle)) => image(handle.clone())
            .width(Length::Fixed(THUMBNAIL_SIZE))
            .height(Length::Fixed(THUMBNAIL_SIZE))
            .content_fit(ContentFit::Cover)
            .into(),
        Some(Thumbnail::Failed) => thumbnail_placeholder("No preview"),
        Some(Thumbnail::Loading) | None => thumbnail_placeholder("Loading..."),
    };

    let details = column![
        text(&record.prompt).size(14),
        text(format!(
            "{} | {}x{}",
            record.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            record.settings.width,
            record.settings.height
        ))
        .size(12)
        .color(MUTED),
    ]
    .spacing(4);

    row![
        preview,
        details,
        horizontal_space(),
        button(text("Download").size(12)).on_press(Message::Download(index)),
    ]
    .align_y(Alignment::Center)
    .spacing(12)
    .into()
}

fn thumbnail_placeholder(label: &'static str) -> Element<'static, Message> {
    container(text(label).size(10).color(MUTED))
        .center_x(Length::Fixed(THUMBNAIL_SIZE))
        .center_y(Length::Fixed(THUMBNAIL_SIZE))
        .into()
}

fn history_panel(session: &Session) -> Element<'_, Message> {
    let stats = session.stats();
    let last = match stats.last_generated {
        Some(timestamp) => timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "None".to_string(),
    };

    column![
        text("Generation History").size(20).color(NEON_GREEN),
        row![
            text(format!("Total Images: {}", stats.total)),
            horizontal_space(),
            text(format!("Last Generated: {last}")),
        ],
    ]
    .spacing(8)
    .into()
}
