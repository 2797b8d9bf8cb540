use std::rc::Rc;

use common::reading::BinSummary;
use yew::prelude::*;
use yew_router::prelude::*;

use super::fetch::use_fetch;
use crate::{request, utils, Route};

const REFRESH_INTERVAL_MS: u32 = 10_000;

#[function_component(BinList)]
pub fn bin_list() -> Html {
    let directory = use_fetch::<Vec<BinSummary>>();

    let refresh = {
        let directory = directory.clone();
        Rc::new(move || {
            directory.run(async {
                let rows = request::bin_directory().await?;
                Ok(rows
                    .iter()
                    .map(|row| BinSummary::from_row(row))
                    .collect())
            })
        })
    };

    {
        let refresh = refresh.clone();
        use_effect_with((), move |_| {
            refresh();
            || ()
        });
    }
    {
        let refresh = refresh.clone();
        yew_hooks::use_interval(move || refresh(), REFRESH_INTERVAL_MS);
    }

    let on_refresh = {
        let refresh = refresh.clone();
        Callback::from(move |_: MouseEvent| refresh())
    };

    let snapshot = directory.snapshot();
    let content = match snapshot.get() {
        None => html! { <p class="text-muted">{"Loading bins..."}</p> },
        Some(Err(e)) => html! {
            <div class="alert alert-danger">{format!("Cannot get bin data: {e}")}</div>
        },
        Some(Ok(bins)) if bins.is_empty() => html! {
            <p class="text-muted">{"No bin has reported a reading yet"}</p>
        },
        Some(Ok(bins)) => bins.iter().map(bin_card).collect::<Html>(),
    };

    html! {
        <>
            <div class="toolbar">
                <button class="btn btn-default" onclick={on_refresh}>{"↻ Refresh"}</button>
                if snapshot.is_pending() {
                    <span class="text-muted">{" updating..."}</span>
                }
            </div>
            <div class="row">
                {content}
            </div>
        </>
    }
}

fn bin_card(bin: &BinSummary) -> Html {
    let fill = bin.fill_level_pct;
    let bar_class = match fill {
        80.. => "progress-bar progress-bar-danger",
        50..=79 => "progress-bar progress-bar-warning",
        _ => "progress-bar progress-bar-success",
    };

    html! {
        <div class="col-lg-3 col-md-4 col-sm-6 col-xs-12" key={bin.bin_id.clone()}>
            <Link<Route> to={Route::Bin { id: bin.bin_id.clone() }}>
                <div class="panel panel-default bin-card">
                    <div class="panel-heading">
                        <h3 class="panel-title">{bin.name.clone()}</h3>
                    </div>
                    <div class="panel-body">
                        <p class="text-muted">{format!("Location: {}", bin.location)}</p>
                        <div class="fill-level">
                            <span>{"Fill Level:"}</span>
                            <strong>{format!("{fill}%")}</strong>
                        </div>
                        <div class="progress">
                            <div class={bar_class} style={format!("width: {}%", fill.clamp(0, 100))}></div>
                        </div>
                        <table class="table table-condensed">
                            <tbody>
                                <tr><td>{"🌡"}</td><td>{format!("{:.1}°C", bin.temperature_c)}</td>
                                    <td>{"💧"}</td><td>{format!("{:.0}%", bin.humidity_pct)}</td></tr>
                                <tr><td>{"💨"}</td><td>{format!("{:.0} ppm", bin.gas_ppm)}</td>
                                    <td>{"🔋"}</td><td>{format!("{:.0}%", bin.battery_pct)}</td></tr>
                            </tbody>
                        </table>
                        <small class="text-muted">{format!("Updated {}", utils::time_ago(&bin.last_updated))}</small>
                    </div>
                </div>
            </Link<Route>>
        </div>
    }
}
