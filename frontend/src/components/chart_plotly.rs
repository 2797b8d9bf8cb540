use chrono::{DateTime, Local, NaiveDate};
use common::req::GraphEntry;
use plotly::{
    common::Mode,
    layout::{Axis, Margin},
    Configuration, Layout, Plot, Scatter,
};
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct Props {
    pub id: String,
    pub entries: Vec<GraphEntry>,
    /// first and last day on the x axis, inclusive
    pub range: Option<(NaiveDate, NaiveDate)>,
}

#[function_component(ChartPlotly)]
pub fn chart_plotly(props: &Props) -> Html {
    {
        let id = props.id.clone();
        let entries = props.entries.clone();
        let range = props.range;

        // replot whenever the data or the window changes
        use_effect_with((entries, range), move |(entries, range)| {
            let plot = fill_level_plot(entries, *range);
            wasm_bindgen_futures::spawn_local(async move {
                plotly::bindings::new_plot(&id, &plot).await;
            });
            || ()
        });
    }

    html! {
        <div class="chart" id={props.id.clone()}></div>
    }
}

fn fill_level_plot(entries: &[GraphEntry], range: Option<(NaiveDate, NaiveDate)>) -> Plot {
    let mut plot = Plot::new();
    let trace = Scatter::new(
        entries
            .iter()
            .map(|e| {
                DateTime::<Local>::from(e.time)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .collect(),
        entries.iter().map(|e| e.level).collect(),
    )
    .name("Fill Level")
    .mode(Mode::LinesMarkers);
    plot.add_trace(trace);
    plot.set_configuration(
        Configuration::default()
            .display_logo(false)
            .editable(false)
            .display_mode_bar(plotly::configuration::DisplayModeBar::Hover),
    );

    let mut x_axis = Axis::new();
    if let Some((first, last)) = range {
        let to = last.succ_opt().unwrap_or(last);
        x_axis = x_axis.range(vec![
            first.format("%Y-%m-%d 00:00:00").to_string(),
            to.format("%Y-%m-%d 00:00:00").to_string(),
        ]);
    }

    plot.set_layout(
        Layout::default()
            .hover_mode(plotly::layout::HoverMode::XUnified)
            .auto_size(true)
            .margin(Margin::default().top(20).bottom(40).left(40).right(20))
            .x_axis(x_axis)
            .y_axis(Axis::new().title("Fill Level (%)".into()).range(vec![0, 100])),
    );
    plot
}
