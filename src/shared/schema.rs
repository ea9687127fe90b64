diesel::table! {
    org_units (objid) {
        objid -> Varchar,
        otype -> Varchar,
        short -> Varchar,
        stext -> Varchar,
        parent_objid -> Nullable<Varchar>,
        begda -> Date,
        endda -> Date,
        responsible_objid -> Nullable<Varchar>,
        costcenter -> Nullable<Varchar>,
        location -> Nullable<Varchar>,
        org_level -> Varchar,
    }
}

diesel::table! {
    employees (pernr) {
        pernr -> Varchar,
        firstname -> Varchar,
        lastname -> Varchar,
        title -> Nullable<Varchar>,
        email -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        location -> Nullable<Varchar>,
        orgeh -> Varchar,
        job -> Nullable<Varchar>,
        plans -> Nullable<Varchar>,
        begda -> Date,
        endda -> Date,
        contract_type -> Nullable<Varchar>,
        workschedule -> Nullable<Varchar>,
        birthdate -> Nullable<Date>,
        gender -> Nullable<Varchar>,
        natio -> Nullable<Varchar>,
        persg -> Nullable<Varchar>,
        persk -> Nullable<Varchar>,
        parent_pernr -> Nullable<Varchar>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(org_units, employees);
