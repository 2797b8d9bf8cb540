mod components;
mod request;
mod utils;

use yew::prelude::*;
use yew_router::prelude::*;

#[derive(Clone, Routable, PartialEq)]
pub enum Route {
    #[at("/")]
    Home,
    #[at("/bins/:id")]
    Bin { id: String },
    #[not_found]
    #[at("/404")]
    NotFound,
}

#[function_component(App)]
fn app() -> Html {
    html! {
        <BrowserRouter>
            <Header />
            <Switch<Route> render={switch} />
        </BrowserRouter>
    }
}

#[function_component(Header)]
fn header() -> Html {
    html! {
        <nav class="navbar navbar-default">
            <div class="container">
                <Link<Route> classes="navbar-brand" to={Route::Home}>{"🗑 Smart Bins"}</Link<Route>>
                <p class="navbar-text navbar-right">
                    {format!("v{}", env!("CARGO_PKG_VERSION"))}
                </p>
            </div>
        </nav>
    }
}

#[function_component(PageHome)]
fn page_home() -> Html {
    html! {
        <div class="container">
            <h1 class="page-header">{"Bin Locations"}</h1>
            <components::bin_list::BinList />
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct PageBinProps {
    id: String,
}

#[function_component(PageBin)]
fn page_bin(props: &PageBinProps) -> Html {
    html! {
        <div class="container">
            <components::bin_details::BinDetails bin_id={props.id.clone()} />
        </div>
    }
}

fn switch(routes: Route) -> Html {
    match routes {
        Route::Home => html! { <PageHome/> },
        Route::Bin { id } => html! { <PageBin {id} /> },
        Route::NotFound => html! { <h1>{ "404" }</h1> },
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<App>::new().render();
}
