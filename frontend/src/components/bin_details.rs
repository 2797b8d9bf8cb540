use std::rc::Rc;

use chrono::{Local, NaiveDate};
use common::{
    reading::BinSummary,
    req::GraphEntry,
    window::{self, ViewMode, ViewWindow},
};
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;
use yew_router::prelude::*;

use super::{chart_plotly::ChartPlotly, chat::Chat, fetch::use_fetch};
use crate::{request, utils, Route};

#[derive(Properties, PartialEq)]
pub struct Props {
    pub bin_id: String,
}

#[function_component(BinDetails)]
pub fn bin_details(props: &Props) -> Html {
    let history = use_fetch::<Vec<GraphEntry>>();
    let summary = use_fetch::<Option<BinSummary>>();
    let view = use_state(|| ViewWindow::new(ViewMode::Day, Local::now().date_naive()));
    let show_table = use_state(|| false);

    let refresh = {
        let history = history.clone();
        let summary = summary.clone();
        let bin_id = props.bin_id.clone();
        Rc::new(move || {
            let id = bin_id.clone();
            history.run(async move { request::bin_history(&id).await });

            let id = bin_id.clone();
            summary.run(async move {
                let rows = request::bin_directory().await?;
                Ok(rows
                    .iter()
                    .find(|row| row.bin == id)
                    .map(|row| BinSummary::from_row(row)))
            });
        })
    };

    {
        let refresh = refresh.clone();
        use_effect_with(props.bin_id.clone(), move |_| {
            refresh();
            || ()
        });
    }

    let on_mode = {
        let view = view.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            if let Ok(mode) = select.value().parse::<ViewMode>() {
                view.set(ViewWindow { mode, ..*view });
            }
        })
    };

    let on_anchor = {
        let view = view.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            // a cleared date input selects nothing
            let anchor = NaiveDate::parse_from_str(&input.value(), "%Y-%m-%d").ok();
            view.set(ViewWindow { anchor, ..*view });
        })
    };

    let on_refresh = {
        let refresh = refresh.clone();
        Callback::from(move |_: MouseEvent| refresh())
    };

    let on_chart_click = {
        let show_table = show_table.clone();
        Callback::from(move |_: MouseEvent| show_table.set(!*show_table))
    };

    let summary = summary.snapshot();
    let header = match summary.get() {
        Some(Ok(Some(bin))) => html! {
            <>
                <h1 class="page-header">{bin.name.clone()}<small>{format!(" {}", bin.location)}</small></h1>
                <p>
                    <strong>{format!("{}% full", bin.fill_level_pct)}</strong>
                    {format!(
                        " · {:.1}°C · {:.0}% humidity · {:.0} ppm · {:.0}% battery · updated {}",
                        bin.temperature_c,
                        bin.humidity_pct,
                        bin.gas_ppm,
                        bin.battery_pct,
                        utils::time_ago(&bin.last_updated),
                    )}
                </p>
            </>
        },
        _ => html! { <h1 class="page-header">{props.bin_id.clone()}</h1> },
    };

    let history = history.snapshot();
    let series: Vec<GraphEntry> = match history.get() {
        Some(Ok(entries)) => entries.clone(),
        _ => vec![],
    };
    let visible = window::filter(&series, &*view, &Local);

    let content = match history.get() {
        None => html! { <p class="text-muted">{"Loading readings..."}</p> },
        Some(Err(e)) => html! {
            <div class="alert alert-danger">{format!("Cannot get readings: {e}")}</div>
        },
        Some(Ok(_)) if visible.is_empty() => html! {
            <div class="alert alert-info">{"No data available for the selected period"}</div>
        },
        Some(Ok(_)) => html! {
            <>
                <div onclick={on_chart_click} title="Click to toggle the table">
                    <ChartPlotly id="fill-level-chart" entries={visible.clone()} range={view.bounds()} />
                </div>
                if *show_table {
                    {readings_table(&visible)}
                }
            </>
        },
    };

    let anchor = view
        .anchor
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    html! {
        <>
            <Link<Route> classes="btn btn-link" to={Route::Home}>{"← All bins"}</Link<Route>>
            {header}
            <form class="form-inline toolbar" onsubmit={Callback::from(|e: SubmitEvent| e.prevent_default())}>
                <select class="form-control" onchange={on_mode}>
                    { for ViewMode::ALL.iter().map(|mode| html! {
                        <option value={mode.as_str()} selected={*mode == view.mode}>{view_label(*mode)}</option>
                    }) }
                </select>
                <input class="form-control" type="date" value={anchor} onchange={on_anchor} />
                <button type="button" class="btn btn-default" onclick={on_refresh}>{"↻ Refresh"}</button>
                if history.is_pending() {
                    <span class="text-muted">{" updating..."}</span>
                }
            </form>
            {content}
            <Chat bin_id={props.bin_id.clone()} data={series} />
        </>
    }
}

fn view_label(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::Day => "Day",
        ViewMode::Week => "Week",
        ViewMode::Month => "Month",
    }
}

fn readings_table(entries: &[GraphEntry]) -> Html {
    html! {
        <table class="table table-striped table-condensed">
            <thead>
                <tr>
                    <th>{"Time"}</th>
                    <th>{"Fill Level"}</th>
                    <th>{"Temperature"}</th>
                    <th>{"Humidity"}</th>
                    <th>{"Gas"}</th>
                    <th>{"Battery"}</th>
                </tr>
            </thead>
            <tbody>
                { for entries.iter().map(|e| html! {
                    <tr>
                        <td>{utils::local_time(&e.time)}</td>
                        <td>{format!("{}%", e.level)}</td>
                        <td>{format!("{}°C", e.temperature)}</td>
                        <td>{format!("{}%", e.humidity)}</td>
                        <td>{format!("{} ppm", e.gas_production)}</td>
                        <td>{format!("{}%", e.battery_charge)}</td>
                    </tr>
                }) }
            </tbody>
        </table>
    }
}
